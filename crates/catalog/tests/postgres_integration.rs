//! PostgreSQL integration tests for the catalog storage
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p catalog --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use catalog::{
    Catalog, CatalogError, Config, CreateVideoInput, PgVideoRepository,
    ProcessAudioVideoMediaInput, SharedVideo, UploadAudioVideoMediaInput, VideoRepository,
};
use domain::{
    AggregateRoot, CreateVideoProps, MediaKind, MediaStatus, Video, VideoError, VideoEvent,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::{Mutex, OnceCell};
use unit_of_work::{PgTransactionProvider, UnitOfWork};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let provider = PgTransactionProvider::connect(&connection_string, 1)
                .await
                .unwrap();
            provider.run_migrations().await.unwrap();
            provider.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Connects a fresh provider and clears the catalog tables
async fn get_test_provider() -> PgTransactionProvider {
    let info = get_container_info().await;

    let provider = PgTransactionProvider::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE videos, audit_entries")
        .execute(provider.pool())
        .await
        .unwrap();

    provider
}

type PgUnitOfWork = UnitOfWork<PgTransactionProvider, VideoEvent>;

async fn get_test_repository() -> (Arc<PgUnitOfWork>, PgVideoRepository) {
    let provider = get_test_provider().await;
    let uow = Arc::new(UnitOfWork::new(Arc::new(provider)));
    let repository = PgVideoRepository::new(Arc::clone(&uow));
    (uow, repository)
}

fn video(title: &str) -> SharedVideo {
    let props = CreateVideoProps {
        title: title.to_string(),
        ..Default::default()
    };
    Arc::new(Mutex::new(Video::create(props).into_result().unwrap()))
}

async fn count_videos(uow: &PgUnitOfWork) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM videos")
        .fetch_one(uow.provider().pool())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn insert_commits_and_find_by_id_restores_the_video() {
    let (uow, repository) = get_test_repository().await;
    let video = video("Vertigo");
    let id = video.lock().await.id();

    repository.insert(video).await.unwrap();

    assert!(!uow.is_active().await);
    assert_eq!(count_videos(&uow).await, 1);
    let found = repository.find_by_id(id).await.unwrap().unwrap();
    let found = found.lock().await;
    assert_eq!(found.title(), "Vertigo");
    assert!(found.events().is_empty());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn update_of_missing_video_is_not_found() {
    let (uow, repository) = get_test_repository().await;
    let video = video("Ghost");
    let id = video.lock().await.id();

    let err = repository.update(video).await.unwrap_err();

    assert!(matches!(err, CatalogError::NotFound(ref e) if e.ids == vec![id.to_string()]));
    assert!(!uow.is_active().await);
    assert_eq!(count_videos(&uow).await, 0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn delete_removes_the_row_once() {
    let (uow, repository) = get_test_repository().await;
    let video = video("Doomed");
    let id = video.lock().await.id();
    repository.insert(video).await.unwrap();

    repository.delete(id).await.unwrap();

    assert_eq!(count_videos(&uow).await, 0);
    assert!(repository.find_by_id(id).await.unwrap().is_none());
    assert!(matches!(
        repository.delete(id).await,
        Err(CatalogError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn find_by_id_inside_transaction_sees_its_own_insert() {
    let (uow, repository) = get_test_repository().await;
    let outside = PgVideoRepository::new(Arc::new(UnitOfWork::new(Arc::clone(uow.provider()))));
    let video = video("Staged");
    let id = video.lock().await.id();

    uow.start().await.unwrap();
    repository.insert(video).await.unwrap();

    assert!(repository.find_by_id(id).await.unwrap().is_some());
    assert!(outside.find_by_id(id).await.unwrap().is_none());
    assert_eq!(uow.aggregate_roots().await.len(), 1);

    uow.commit().await.unwrap();
    assert!(outside.find_by_id(id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn catalog_commits_video_and_audit_trail_together() {
    let provider = get_test_provider().await;
    let catalog = Catalog::postgres(&Config::default(), provider);

    let id = catalog
        .videos
        .create_video(CreateVideoInput {
            title: "Playtime".to_string(),
            year_launched: 1967,
            duration: 124,
            ..Default::default()
        })
        .await
        .unwrap()
        .id;
    catalog
        .videos
        .upload_audio_video_media(UploadAudioVideoMediaInput {
            video_id: id,
            kind: MediaKind::Video,
            name: "feature.mp4".to_string(),
            raw_location: "raw/feature.mp4".to_string(),
        })
        .await
        .unwrap();

    let err = catalog
        .videos
        .process_audio_video_media(ProcessAudioVideoMediaInput {
            video_id: id,
            kind: MediaKind::Video,
            status: MediaStatus::Completed,
            encoded_location: Some("encoded/feature.mp4".to_string()),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Video(VideoError::InvalidMediaTransition { .. })
    ));

    let video = catalog.videos.get_video(id).await.unwrap();
    assert_eq!(video.video.unwrap().status, MediaStatus::Pending);

    let audit: Vec<_> = catalog
        .videos
        .audit_trail(id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.event_type)
        .collect();
    assert_eq!(audit, vec!["VideoCreated", "VideoAudioMediaReplaced"]);
    assert_eq!(catalog.transport.messages().await.len(), 2);
}
