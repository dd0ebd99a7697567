//! Video aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, Either, Notification};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, Reactors};
use crate::event::EventBuffer;

use super::{
    AudioVideoMedia, CastMemberId, CategoryId, GenreId, MediaKind, VideoError, VideoEvent,
    VideoEventKind,
};

/// Longest accepted title, in characters.
pub const TITLE_MAX_LENGTH: usize = 255;

/// Input for [`Video::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateVideoProps {
    /// Title shown in the catalog.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Release year.
    pub year_launched: u16,
    /// Running time in minutes.
    pub duration: u32,
    /// Whether the video is free to watch.
    pub is_opened: bool,
    /// Categories the video is filed under.
    pub category_ids: Vec<CategoryId>,
    /// Genres the video is filed under.
    pub genre_ids: Vec<GenreId>,
    /// Cast members credited on the video.
    pub cast_member_ids: Vec<CastMemberId>,
}

/// Persisted state of a video, without its event buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSnapshot {
    pub id: AggregateId,
    pub title: String,
    pub description: String,
    pub year_launched: u16,
    pub duration: u32,
    pub is_opened: bool,
    pub is_published: bool,
    pub category_ids: Vec<CategoryId>,
    pub genre_ids: Vec<GenreId>,
    pub cast_member_ids: Vec<CastMemberId>,
    pub video: Option<AudioVideoMedia>,
    pub trailer: Option<AudioVideoMedia>,
    pub created_at: DateTime<Utc>,
}

/// Video aggregate root.
///
/// A video becomes published once both its video file and its trailer are
/// encoded. `is_published` is derived: a reactor recomputes it whenever a
/// sub-resource changes, and nothing else writes it.
#[derive(Debug, Clone)]
pub struct Video {
    id: AggregateId,
    title: String,
    description: String,
    year_launched: u16,
    duration: u32,
    is_opened: bool,
    is_published: bool,
    category_ids: Vec<CategoryId>,
    genre_ids: Vec<GenreId>,
    cast_member_ids: Vec<CastMemberId>,
    video: Option<AudioVideoMedia>,
    trailer: Option<AudioVideoMedia>,
    created_at: DateTime<Utc>,
    events: EventBuffer<VideoEvent>,
    reactors: Reactors<Video>,
}

impl AggregateRoot for Video {
    type Event = VideoEvent;

    fn aggregate_type() -> &'static str {
        "Video"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn events(&self) -> &EventBuffer<VideoEvent> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventBuffer<VideoEvent> {
        &mut self.events
    }

    fn reactors(&self) -> &Reactors<Self> {
        &self.reactors
    }

    fn reactors_mut(&mut self) -> &mut Reactors<Self> {
        &mut self.reactors
    }
}

// Construction
impl Video {
    /// Creates a new video, or reports every invalid field at once.
    pub fn create(props: CreateVideoProps) -> Either<Video, Notification> {
        let notification = Self::validate_title(&props.title);
        if notification.has_errors() {
            return Either::fail(notification);
        }

        let mut video = Self::from_snapshot(VideoSnapshot {
            id: AggregateId::new(),
            title: props.title,
            description: props.description,
            year_launched: props.year_launched,
            duration: props.duration,
            is_opened: props.is_opened,
            is_published: false,
            category_ids: dedup(props.category_ids),
            genre_ids: dedup(props.genre_ids),
            cast_member_ids: dedup(props.cast_member_ids),
            video: None,
            trailer: None,
            created_at: Utc::now(),
        });

        video.apply_event(VideoEvent::video_created(
            video.id,
            video.title.clone(),
            video.category_ids.clone(),
            video.genre_ids.clone(),
            video.cast_member_ids.clone(),
        ));

        Either::ok(video)
    }

    /// Rebuilds a video from persisted state. The event buffer starts empty.
    pub fn restore(snapshot: VideoSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }

    /// Returns the persisted state of this video.
    pub fn snapshot(&self) -> VideoSnapshot {
        VideoSnapshot {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            year_launched: self.year_launched,
            duration: self.duration,
            is_opened: self.is_opened,
            is_published: self.is_published,
            category_ids: self.category_ids.clone(),
            genre_ids: self.genre_ids.clone(),
            cast_member_ids: self.cast_member_ids.clone(),
            video: self.video.clone(),
            trailer: self.trailer.clone(),
            created_at: self.created_at,
        }
    }

    fn from_snapshot(snapshot: VideoSnapshot) -> Self {
        let mut video = Self {
            id: snapshot.id,
            title: snapshot.title,
            description: snapshot.description,
            year_launched: snapshot.year_launched,
            duration: snapshot.duration,
            is_opened: snapshot.is_opened,
            is_published: snapshot.is_published,
            category_ids: snapshot.category_ids,
            genre_ids: snapshot.genre_ids,
            cast_member_ids: snapshot.cast_member_ids,
            video: snapshot.video,
            trailer: snapshot.trailer,
            created_at: snapshot.created_at,
            events: EventBuffer::new(),
            reactors: Reactors::new(),
        };
        video.register_handler(VideoEventKind::VideoCreated, Self::on_media_changed);
        video.register_handler(VideoEventKind::VideoAudioMediaReplaced, Self::on_media_changed);
        video.register_handler(VideoEventKind::VideoMediaStatusChanged, Self::on_media_changed);
        video
    }

    fn validate_title(title: &str) -> Notification {
        let mut notification = Notification::new();
        if title.trim().is_empty() {
            notification.add_error("title should not be empty", Some("title"));
        }
        if title.chars().count() > TITLE_MAX_LENGTH {
            notification.add_error(
                format!("title must be shorter than or equal to {TITLE_MAX_LENGTH} characters"),
                Some("title"),
            );
        }
        notification
    }
}

// Query methods
impl Video {
    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the release year.
    pub fn year_launched(&self) -> u16 {
        self.year_launched
    }

    /// Returns the running time in minutes.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Returns true if the video is free to watch.
    pub fn is_opened(&self) -> bool {
        self.is_opened
    }

    /// Returns true once both the video file and the trailer are encoded.
    pub fn is_published(&self) -> bool {
        self.is_published
    }

    /// Returns the category IDs.
    pub fn category_ids(&self) -> &[CategoryId] {
        &self.category_ids
    }

    /// Returns the genre IDs.
    pub fn genre_ids(&self) -> &[GenreId] {
        &self.genre_ids
    }

    /// Returns the cast member IDs.
    pub fn cast_member_ids(&self) -> &[CastMemberId] {
        &self.cast_member_ids
    }

    /// Returns the sub-resource of the given kind.
    pub fn media(&self, kind: MediaKind) -> Option<&AudioVideoMedia> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Trailer => self.trailer.as_ref(),
        }
    }

    /// Returns when the video was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// Command methods
impl Video {
    /// Changes the title, or reports why the new one is invalid.
    pub fn change_title(&mut self, title: impl Into<String>) -> Either<(), Notification> {
        let title = title.into();
        let notification = Self::validate_title(&title);
        if notification.has_errors() {
            return Either::fail(notification);
        }
        self.title = title;
        Either::ok(())
    }

    /// Changes the description.
    pub fn change_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Marks the video as free to watch.
    pub fn mark_as_opened(&mut self) {
        self.is_opened = true;
    }

    /// Marks the video as requiring a subscription.
    pub fn mark_as_not_opened(&mut self) {
        self.is_opened = false;
    }

    /// Replaces the category set. Duplicates are dropped.
    pub fn sync_category_ids(&mut self, ids: Vec<CategoryId>) {
        self.category_ids = dedup(ids);
    }

    /// Replaces the genre set. Duplicates are dropped.
    pub fn sync_genre_ids(&mut self, ids: Vec<GenreId>) {
        self.genre_ids = dedup(ids);
    }

    /// Replaces the cast member set. Duplicates are dropped.
    pub fn sync_cast_member_ids(&mut self, ids: Vec<CastMemberId>) {
        self.cast_member_ids = dedup(ids);
    }

    /// Stores `media` as the sub-resource of `kind`, replacing any previous one.
    pub fn replace(&mut self, kind: MediaKind, media: AudioVideoMedia) {
        *self.media_slot(kind) = Some(media.clone());
        self.apply_event(VideoEvent::media_replaced(self.id, kind, media));
    }

    /// Replaces the video file.
    pub fn replace_video(&mut self, media: AudioVideoMedia) {
        self.replace(MediaKind::Video, media);
    }

    /// Replaces the trailer.
    pub fn replace_trailer(&mut self, media: AudioVideoMedia) {
        self.replace(MediaKind::Trailer, media);
    }

    /// Records that the encoder picked up the sub-resource of `kind`.
    pub fn process_media(&mut self, kind: MediaKind) -> Result<(), VideoError> {
        self.transition_media(kind, |media| media.process())
    }

    /// Records that the sub-resource of `kind` was encoded to `encoded_location`.
    pub fn complete_media(
        &mut self,
        kind: MediaKind,
        encoded_location: impl Into<String>,
    ) -> Result<(), VideoError> {
        let encoded_location = encoded_location.into();
        self.transition_media(kind, |media| media.complete(encoded_location))
    }

    /// Records that encoding the sub-resource of `kind` failed.
    pub fn fail_media(&mut self, kind: MediaKind) -> Result<(), VideoError> {
        self.transition_media(kind, |media| media.fail())
    }

    fn transition_media<F>(&mut self, kind: MediaKind, transition: F) -> Result<(), VideoError>
    where
        F: FnOnce(&AudioVideoMedia) -> Result<AudioVideoMedia, VideoError>,
    {
        let current = self
            .media(kind)
            .ok_or(VideoError::MediaNotFound { kind })?;
        let next = transition(current)?;
        let (from, to) = (current.status, next.status);

        *self.media_slot(kind) = Some(next);
        self.apply_event(VideoEvent::media_status_changed(self.id, kind, from, to));
        Ok(())
    }

    fn media_slot(&mut self, kind: MediaKind) -> &mut Option<AudioVideoMedia> {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Trailer => &mut self.trailer,
        }
    }
}

// Reactors
impl Video {
    fn on_media_changed(video: &mut Video, _event: &VideoEvent) {
        let ready = |media: &Option<AudioVideoMedia>| {
            media.as_ref().is_some_and(AudioVideoMedia::is_completed)
        };
        video.is_published = ready(&video.video) && ready(&video.trailer);
    }
}

fn dedup<T: PartialEq>(ids: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DomainEvent;
    use crate::video::MediaStatus;

    fn create_video() -> Video {
        let props = CreateVideoProps {
            title: "The Movie".to_string(),
            year_launched: 2024,
            duration: 90,
            ..Default::default()
        };
        let (video, errors) = Video::create(props).into_pair();
        assert!(errors.is_none());
        video.unwrap()
    }

    fn encoded(name: &str) -> AudioVideoMedia {
        AudioVideoMedia::create(name, format!("raw/{name}"))
            .process()
            .unwrap()
            .complete(format!("encoded/{name}"))
            .unwrap()
    }

    fn failed(name: &str) -> AudioVideoMedia {
        AudioVideoMedia::create(name, format!("raw/{name}"))
            .fail()
            .unwrap()
    }

    #[test]
    fn test_create_records_created_event() {
        let video = create_video();
        assert_eq!(video.title(), "The Movie");
        assert!(!video.is_published());

        let events = video.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.event_type(), "VideoCreated");
        assert_eq!(events[0].event.aggregate_id(), video.id());
    }

    #[test]
    fn test_create_reports_invalid_title() {
        let props = CreateVideoProps {
            title: "x".repeat(TITLE_MAX_LENGTH + 1),
            ..Default::default()
        };
        let (video, errors) = Video::create(props).into_pair();
        assert!(video.is_none());
        assert_eq!(
            errors.unwrap().field_errors("title").unwrap(),
            ["title must be shorter than or equal to 255 characters"]
        );
    }

    #[test]
    fn test_create_reports_empty_title() {
        let (_, errors) = Video::create(CreateVideoProps::default()).into_pair();
        assert_eq!(
            errors.unwrap().field_errors("title").unwrap(),
            ["title should not be empty"]
        );
    }

    #[test]
    fn test_create_drops_duplicate_related_ids() {
        let category = CategoryId::new();
        let props = CreateVideoProps {
            title: "t".to_string(),
            category_ids: vec![category, category],
            ..Default::default()
        };
        let video = Video::create(props).into_result().unwrap();
        assert_eq!(video.category_ids(), [category]);
    }

    #[test]
    fn test_published_only_when_both_media_completed() {
        let mut video = create_video();
        assert!(!video.is_published());

        video.replace_video(encoded("movie.mp4"));
        assert!(!video.is_published());

        video.replace_trailer(encoded("trailer.mp4"));
        assert!(video.is_published());

        video.replace_trailer(failed("trailer2.mp4"));
        assert!(!video.is_published());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut video = create_video();
        video.replace_video(encoded("movie.mp4"));
        video.replace_trailer(encoded("trailer.mp4"));
        assert!(video.is_published());

        video.replace_video(encoded("movie-v2.mp4"));
        assert!(video.is_published());
    }

    #[test]
    fn test_encoder_progress_drives_publication() {
        let mut video = create_video();
        video.replace_video(AudioVideoMedia::create("movie.mp4", "raw/movie.mp4"));
        video.replace_trailer(encoded("trailer.mp4"));
        assert!(!video.is_published());

        video.process_media(MediaKind::Video).unwrap();
        assert_eq!(
            video.media(MediaKind::Video).unwrap().status,
            MediaStatus::Processing
        );
        assert!(!video.is_published());

        video
            .complete_media(MediaKind::Video, "encoded/movie.m3u8")
            .unwrap();
        assert!(video.is_published());
        assert_eq!(video.uncommitted_events().len(), 5);
    }

    #[test]
    fn test_encoder_failure_unpublishes() {
        let mut video = create_video();
        video.replace_video(AudioVideoMedia::create("movie.mp4", "raw/movie.mp4"));
        video.replace_trailer(encoded("trailer.mp4"));

        video.fail_media(MediaKind::Video).unwrap();
        assert!(!video.is_published());
        assert!(video.complete_media(MediaKind::Video, "x").is_err());
    }

    #[test]
    fn test_transition_without_media_fails() {
        let mut video = create_video();
        let result = video.process_media(MediaKind::Trailer);
        assert!(matches!(
            result,
            Err(VideoError::MediaNotFound {
                kind: MediaKind::Trailer
            })
        ));
        assert_eq!(video.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_change_title_validates() {
        let mut video = create_video();
        assert!(video.change_title("").is_fail());
        assert_eq!(video.title(), "The Movie");

        assert!(video.change_title("New").is_ok());
        assert_eq!(video.title(), "New");
    }

    #[test]
    fn test_restore_has_empty_buffer_and_live_reactors() {
        let mut video = create_video();
        video.replace_video(encoded("movie.mp4"));

        let mut restored = Video::restore(video.snapshot());
        assert_eq!(restored.id(), video.id());
        assert!(restored.events().is_empty());

        restored.replace_trailer(encoded("trailer.mp4"));
        assert!(restored.is_published());
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut video = create_video();
        video.replace_video(encoded("movie.mp4"));

        let json = serde_json::to_string(&video.snapshot()).unwrap();
        let snapshot: VideoSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, video.snapshot());
    }
}
