//! Video use cases.
//!
//! Each write use case is one [`ApplicationService::run`] call on an
//! [`Operation`] of its own: the video is changed, written through the
//! repository, its domain events reach the audit trail before commit, and
//! its integration events reach the message transport after commit.

use std::sync::Arc;

use application::ApplicationService;
use common::{AggregateId, EntityValidationError, NotFoundError, Notification};
use domain::{
    AggregateRoot, AudioVideoMedia, CastMemberId, CategoryId, CreateVideoProps, GenreId,
    MediaKind, MediaStatus, Video, VideoEvent, VideoSnapshot,
};
use mediator::IntegrationEventHandler;
use serde::{Deserialize, Serialize};
use unit_of_work::UnitOfWork;

use crate::build_mediator;
use crate::handlers::{AuditEntry, VideoAuditTrail};
use crate::relations::VideoRelationsValidator;
use crate::repository::{SharedVideo, VideoRepository, share};
use crate::storage::Storage;
use crate::{CatalogError, Result};

/// Input of [`VideoUseCases::create_video`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateVideoInput {
    pub title: String,
    pub description: String,
    pub year_launched: u16,
    pub duration: u32,
    pub is_opened: bool,
    pub category_ids: Vec<CategoryId>,
    pub genre_ids: Vec<GenreId>,
    pub cast_member_ids: Vec<CastMemberId>,
}

impl From<CreateVideoInput> for CreateVideoProps {
    fn from(input: CreateVideoInput) -> Self {
        CreateVideoProps {
            title: input.title,
            description: input.description,
            year_launched: input.year_launched,
            duration: input.duration,
            is_opened: input.is_opened,
            category_ids: input.category_ids,
            genre_ids: input.genre_ids,
            cast_member_ids: input.cast_member_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreateVideoOutput {
    pub id: AggregateId,
}

/// Input of [`VideoUseCases::upload_audio_video_media`].
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAudioVideoMediaInput {
    pub video_id: AggregateId,
    pub kind: MediaKind,
    pub name: String,
    pub raw_location: String,
}

/// Encoder callback for one sub-resource of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessAudioVideoMediaInput {
    pub video_id: AggregateId,
    pub kind: MediaKind,
    pub status: MediaStatus,
    #[serde(default)]
    pub encoded_location: Option<String>,
}

impl ProcessAudioVideoMediaInput {
    fn validate(&self) -> Notification {
        let mut notification = Notification::new();
        match self.status {
            MediaStatus::Pending => notification.add_error(
                "status must be one of processing, completed, failed",
                Some("status"),
            ),
            MediaStatus::Completed
                if self
                    .encoded_location
                    .as_deref()
                    .is_none_or(|location| location.trim().is_empty()) =>
            {
                notification.add_error(
                    "encoded_location is required when status is completed",
                    Some("encoded_location"),
                )
            }
            _ => {}
        }
        notification
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessAudioVideoMediaOutput {
    pub video_id: AggregateId,
    pub status: MediaStatus,
    pub is_published: bool,
}

/// Unit of work, application service and repository serving one use case
/// call.
struct Operation<S: Storage> {
    service: ApplicationService<S::Provider, VideoEvent>,
    videos: Arc<dyn VideoRepository>,
}

impl<S: Storage> Operation<S> {
    async fn load(&self, id: AggregateId) -> Result<SharedVideo> {
        load(self.videos.as_ref(), id).await
    }
}

async fn load(videos: &dyn VideoRepository, id: AggregateId) -> Result<SharedVideo> {
    videos
        .find_by_id(id)
        .await?
        .ok_or_else(|| NotFoundError::new(id, Video::aggregate_type()).into())
}

/// Catalog operations on videos.
///
/// Calls never share a transaction: every call builds its own unit of work,
/// so calls may run concurrently on one instance.
pub struct VideoUseCases<S: Storage> {
    storage: S,
    publisher: Arc<dyn IntegrationEventHandler>,
    relations: VideoRelationsValidator,
}

impl<S: Storage> VideoUseCases<S> {
    pub fn new(
        storage: S,
        publisher: Arc<dyn IntegrationEventHandler>,
        relations: VideoRelationsValidator,
    ) -> Self {
        Self {
            storage,
            publisher,
            relations,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn begin_operation(&self) -> Operation<S> {
        let uow = Arc::new(UnitOfWork::new(Arc::clone(self.storage.provider())));
        let audit = Arc::new(VideoAuditTrail::new(
            self.storage.audit_log(Arc::clone(&uow)),
        ));
        let mediator = build_mediator(audit, Arc::clone(&self.publisher));
        Operation {
            videos: self.storage.videos(Arc::clone(&uow)),
            service: ApplicationService::new(uow, Arc::new(mediator)),
        }
    }

    /// Validates and stores a new video.
    ///
    /// Missing related entities and invalid fields are reported together in
    /// one [`EntityValidationError`].
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_video(&self, input: CreateVideoInput) -> Result<CreateVideoOutput> {
        let mut notification = self
            .relations
            .validate(&input.category_ids, &input.genre_ids, &input.cast_member_ids)
            .await;

        let created = Video::create(input.into());
        if let Some(errors) = created.error() {
            notification.copy_errors(errors);
        }
        if notification.has_errors() {
            return Err(EntityValidationError::new(notification).into());
        }

        let video = created.into_result().map_err(EntityValidationError::new)?;
        let id = video.id();
        let video = share(video);
        let operation = self.begin_operation();
        operation
            .service
            .run(|| async { operation.videos.insert(video).await })
            .await?;

        tracing::info!(video_id = %id, "video created");
        Ok(CreateVideoOutput { id })
    }

    /// Attaches a freshly uploaded file as the video or the trailer.
    #[tracing::instrument(
        skip(self, input),
        fields(video_id = %input.video_id, kind = %input.kind)
    )]
    pub async fn upload_audio_video_media(&self, input: UploadAudioVideoMediaInput) -> Result<()> {
        let operation = self.begin_operation();
        operation
            .service
            .run(|| async {
                let video = operation.load(input.video_id).await?;
                video.lock().await.replace(
                    input.kind,
                    AudioVideoMedia::create(input.name, input.raw_location),
                );
                operation.videos.update(video).await
            })
            .await
    }

    /// Applies an encoder status report to one sub-resource.
    #[tracing::instrument(
        skip(self, input),
        fields(video_id = %input.video_id, kind = %input.kind, status = %input.status)
    )]
    pub async fn process_audio_video_media(
        &self,
        input: ProcessAudioVideoMediaInput,
    ) -> Result<ProcessAudioVideoMediaOutput> {
        let notification = input.validate();
        if notification.has_errors() {
            return Err(EntityValidationError::new(notification).into());
        }

        let operation = self.begin_operation();
        operation
            .service
            .run::<_, CatalogError, _, _>(|| async {
                let video = operation.load(input.video_id).await?;
                {
                    let mut guard = video.lock().await;
                    match (input.status, input.encoded_location) {
                        (MediaStatus::Processing, _) => guard.process_media(input.kind)?,
                        (MediaStatus::Completed, Some(location)) => {
                            guard.complete_media(input.kind, location)?
                        }
                        (MediaStatus::Failed, _) => guard.fail_media(input.kind)?,
                        _ => {}
                    }
                }
                operation.videos.update(Arc::clone(&video)).await?;
                let is_published = video.lock().await.is_published();
                Ok(ProcessAudioVideoMediaOutput {
                    video_id: input.video_id,
                    status: input.status,
                    is_published,
                })
            })
            .await
    }

    /// Returns the committed state of a video.
    #[tracing::instrument(skip(self))]
    pub async fn get_video(&self, id: AggregateId) -> Result<VideoSnapshot> {
        let uow = Arc::new(UnitOfWork::new(Arc::clone(self.storage.provider())));
        let video = load(self.storage.videos(uow).as_ref(), id).await?;
        let snapshot = video.lock().await.snapshot();
        Ok(snapshot)
    }

    /// Returns the committed audit trail of a video, oldest entry first.
    #[tracing::instrument(skip(self))]
    pub async fn audit_trail(&self, id: AggregateId) -> Result<Vec<AuditEntry>> {
        let uow = Arc::new(UnitOfWork::new(Arc::clone(self.storage.provider())));
        self.storage.audit_log(uow).entries_for(id).await
    }

    /// Removes a video.
    #[tracing::instrument(skip(self))]
    pub async fn delete_video(&self, id: AggregateId) -> Result<()> {
        let operation = self.begin_operation();
        operation
            .service
            .run(|| async { operation.videos.delete(id).await })
            .await
    }
}
