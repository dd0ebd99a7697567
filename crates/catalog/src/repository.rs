//! Video persistence.
//!
//! Repositories write through the unit of work: inside an active
//! transaction they join it, otherwise each write runs in its own. Every
//! written video is registered with the unit of work so its buffered events
//! are published when the surrounding operation finishes.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, NotFoundError};
use domain::{AggregateRoot, Video, VideoEvent, VideoSnapshot};
use tokio::sync::Mutex;
use unit_of_work::{
    InMemoryTransactionProvider, PgTransactionProvider, SharedAggregate, TransactionProvider,
    UnitOfWork, UnitOfWorkError,
};

use crate::{CatalogError, Result};

/// A loaded video, shared with the unit of work once written.
pub type SharedVideo = Arc<Mutex<Video>>;

/// Wraps a freshly created or restored video for use with a repository.
pub fn share(video: Video) -> SharedVideo {
    Arc::new(Mutex::new(video))
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Stores a new video.
    async fn insert(&self, video: SharedVideo) -> Result<()>;

    /// Overwrites an existing video; fails with not-found when it is missing.
    async fn update(&self, video: SharedVideo) -> Result<()>;

    /// Removes a video; fails with not-found when it is missing.
    async fn delete(&self, id: AggregateId) -> Result<()>;

    /// Loads a video, seeing the active transaction's own writes.
    async fn find_by_id(&self, id: AggregateId) -> Result<Option<SharedVideo>>;
}

fn not_found(id: AggregateId) -> NotFoundError {
    NotFoundError::new(id, Video::aggregate_type())
}

fn key(id: AggregateId) -> String {
    format!("videos/{id}")
}

async fn register<P: TransactionProvider>(uow: &UnitOfWork<P, VideoEvent>, video: SharedVideo) {
    let aggregate: SharedAggregate<VideoEvent> = video;
    uow.add_aggregate_root(aggregate).await;
}

/// Video repository over the in-memory transactional store.
pub struct InMemoryVideoRepository {
    uow: Arc<UnitOfWork<InMemoryTransactionProvider, VideoEvent>>,
}

impl InMemoryVideoRepository {
    pub fn new(uow: Arc<UnitOfWork<InMemoryTransactionProvider, VideoEvent>>) -> Self {
        Self { uow }
    }

    async fn load(&self, id: AggregateId) -> Result<Option<VideoSnapshot>> {
        let key = key(id);
        let value = match self.uow.transaction().await {
            Ok(transaction) => self.uow.provider().read(&transaction, &key).await,
            Err(UnitOfWorkError::NoActiveTransaction) => self.uow.provider().get(&key).await,
            Err(err) => return Err(err.into()),
        };
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    async fn write(&self, video: SharedVideo, must_exist: bool) -> Result<()> {
        let snapshot = video.lock().await.snapshot();
        let value = serde_json::to_value(&snapshot)?;

        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                if must_exist && self.load(snapshot.id).await?.is_none() {
                    return Err(not_found(snapshot.id).into());
                }
                self.uow
                    .with_transaction(|transaction| transaction.put(key(snapshot.id), value))
                    .await?;
                register(&self.uow, video).await;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    #[tracing::instrument(skip(self, video))]
    async fn insert(&self, video: SharedVideo) -> Result<()> {
        self.write(video, false).await
    }

    #[tracing::instrument(skip(self, video))]
    async fn update(&self, video: SharedVideo) -> Result<()> {
        self.write(video, true).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: AggregateId) -> Result<()> {
        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                if self.load(id).await?.is_none() {
                    return Err(not_found(id).into());
                }
                self.uow
                    .with_transaction(|transaction| transaction.delete(key(id)))
                    .await?;
                Ok(())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: AggregateId) -> Result<Option<SharedVideo>> {
        Ok(self.load(id).await?.map(|snapshot| share(Video::restore(snapshot))))
    }
}

/// Video repository over PostgreSQL.
pub struct PgVideoRepository {
    uow: Arc<UnitOfWork<PgTransactionProvider, VideoEvent>>,
}

impl PgVideoRepository {
    pub fn new(uow: Arc<UnitOfWork<PgTransactionProvider, VideoEvent>>) -> Self {
        Self { uow }
    }

    async fn execute_write(&self, video: SharedVideo, update: bool) -> Result<()> {
        let snapshot = video.lock().await.snapshot();
        let payload = serde_json::to_value(&snapshot)?;
        let sql = if update {
            r#"
            UPDATE videos
            SET title = $2, is_published = $3, snapshot = $4, updated_at = NOW()
            WHERE id = $1
            "#
        } else {
            r#"
            INSERT INTO videos (id, title, is_published, snapshot, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#
        };

        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                let rows = {
                    let mut transaction = self.uow.transaction().await?;
                    sqlx::query(sql)
                        .bind(snapshot.id.as_uuid())
                        .bind(&snapshot.title)
                        .bind(snapshot.is_published)
                        .bind(&payload)
                        .execute(&mut **transaction)
                        .await?
                        .rows_affected()
                };
                if rows == 0 {
                    return Err(not_found(snapshot.id).into());
                }
                register(&self.uow, video).await;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[tracing::instrument(skip(self, video))]
    async fn insert(&self, video: SharedVideo) -> Result<()> {
        self.execute_write(video, false).await
    }

    #[tracing::instrument(skip(self, video))]
    async fn update(&self, video: SharedVideo) -> Result<()> {
        self.execute_write(video, true).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: AggregateId) -> Result<()> {
        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                let mut transaction = self.uow.transaction().await?;
                let rows = sqlx::query("DELETE FROM videos WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut **transaction)
                    .await?
                    .rows_affected();
                if rows == 0 {
                    return Err(not_found(id).into());
                }
                Ok(())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: AggregateId) -> Result<Option<SharedVideo>> {
        let query = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT snapshot FROM videos WHERE id = $1",
        )
        .bind(id.as_uuid());

        let payload = match self.uow.transaction().await {
            Ok(mut transaction) => query.fetch_optional(&mut **transaction).await?,
            Err(UnitOfWorkError::NoActiveTransaction) => {
                query.fetch_optional(self.uow.provider().pool()).await?
            }
            Err(err) => return Err(err.into()),
        };

        let Some(payload) = payload else {
            return Ok(None);
        };
        let snapshot: VideoSnapshot = serde_json::from_value(payload)?;
        Ok(Some(share(Video::restore(snapshot))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::CreateVideoProps;

    fn setup() -> (
        Arc<UnitOfWork<InMemoryTransactionProvider, VideoEvent>>,
        InMemoryVideoRepository,
    ) {
        let provider = Arc::new(InMemoryTransactionProvider::new());
        let uow = Arc::new(UnitOfWork::new(provider));
        let repository = InMemoryVideoRepository::new(Arc::clone(&uow));
        (uow, repository)
    }

    fn video(title: &str) -> SharedVideo {
        let props = CreateVideoProps {
            title: title.to_string(),
            ..Default::default()
        };
        share(Video::create(props).into_result().unwrap())
    }

    #[tokio::test]
    async fn insert_outside_transaction_commits_on_its_own() {
        let (uow, repository) = setup();
        let video = video("Standalone");
        let id = video.lock().await.id();

        repository.insert(video).await.unwrap();

        assert!(!uow.is_active().await);
        assert_eq!(uow.provider().stats().await.committed, 1);
        let found = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.lock().await.title(), "Standalone");
    }

    #[tokio::test]
    async fn writes_join_active_transaction_and_register_aggregate() {
        let (uow, repository) = setup();
        uow.start().await.unwrap();
        let video = video("Joined");
        let id = video.lock().await.id();

        repository.insert(Arc::clone(&video)).await.unwrap();
        repository.update(Arc::clone(&video)).await.unwrap();

        assert!(uow.provider().get(&key(id)).await.is_none());
        assert!(repository.find_by_id(id).await.unwrap().is_some());
        assert_eq!(uow.aggregate_roots().await.len(), 1);

        uow.commit().await.unwrap();
        assert!(uow.provider().get(&key(id)).await.is_some());
    }

    #[tokio::test]
    async fn update_of_missing_video_is_not_found() {
        let (uow, repository) = setup();
        let video = video("Ghost");
        let id = video.lock().await.id();

        let err = repository.update(video).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref e) if e.ids == vec![id.to_string()]));
        assert_eq!(uow.provider().stats().await.rolled_back, 1);
    }

    #[tokio::test]
    async fn delete_removes_video() {
        let (_, repository) = setup();
        let video = video("Doomed");
        let id = video.lock().await.id();
        repository.insert(video).await.unwrap();

        repository.delete(id).await.unwrap();
        assert!(repository.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            repository.delete(id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restored_video_keeps_state_but_not_events() {
        let (_, repository) = setup();
        let video = video("Restored");
        let id = video.lock().await.id();
        repository.insert(video).await.unwrap();

        let found = repository.find_by_id(id).await.unwrap().unwrap();
        let found = found.lock().await;
        assert_eq!(found.id(), id);
        assert!(found.events().is_empty());
    }
}
