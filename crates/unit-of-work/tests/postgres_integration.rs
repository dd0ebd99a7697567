//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p unit-of-work --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use domain::VideoEvent;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use unit_of_work::{PgTransactionProvider, UnitOfWork, UnitOfWorkError};
use uuid::Uuid;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
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

/// Get a fresh unit of work with its own pool and cleared tables
async fn get_test_uow() -> (PgPool, UnitOfWork<PgTransactionProvider, VideoEvent>) {
    let info = get_container_info().await;

    let provider = PgTransactionProvider::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE videos")
        .execute(provider.pool())
        .await
        .unwrap();

    let pool = provider.pool().clone();
    (pool, UnitOfWork::new(Arc::new(provider)))
}

async fn insert_row(
    uow: &UnitOfWork<PgTransactionProvider, VideoEvent>,
    id: Uuid,
) -> Result<(), UnitOfWorkError> {
    let mut tx = uow.transaction().await?;
    sqlx::query("INSERT INTO videos (id, title, snapshot) VALUES ($1, $2, $3)")
        .bind(id)
        .bind("title")
        .bind(serde_json::json!({}))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn count_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM videos")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn commit_persists_writes() {
    let (pool, uow) = get_test_uow().await;

    uow.start().await.unwrap();
    insert_row(&uow, Uuid::new_v4()).await.unwrap();
    assert_eq!(count_rows(&pool).await, 0);

    uow.commit().await.unwrap();
    assert_eq!(count_rows(&pool).await, 1);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn rollback_discards_writes() {
    let (pool, uow) = get_test_uow().await;

    uow.start().await.unwrap();
    insert_row(&uow, Uuid::new_v4()).await.unwrap();
    uow.rollback().await.unwrap();

    assert_eq!(count_rows(&pool).await, 0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn nested_work_commits_with_outer_transaction() {
    let (pool, uow) = get_test_uow().await;

    uow.start().await.unwrap();
    uow.do_work(|| insert_row(&uow, Uuid::new_v4()))
        .await
        .unwrap();
    uow.do_work(|| insert_row(&uow, Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(count_rows(&pool).await, 0);

    uow.commit().await.unwrap();
    assert_eq!(count_rows(&pool).await, 2);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn standalone_work_rolls_back_on_constraint_violation() {
    let (pool, uow) = get_test_uow().await;
    let id = Uuid::new_v4();

    uow.do_work(|| insert_row(&uow, id)).await.unwrap();
    assert_eq!(count_rows(&pool).await, 1);

    let result = uow
        .do_work(|| async {
            insert_row(&uow, Uuid::new_v4()).await?;
            insert_row(&uow, id).await
        })
        .await;

    assert!(matches!(result, Err(UnitOfWorkError::Database(_))));
    assert!(!uow.is_active().await);
    assert_eq!(count_rows(&pool).await, 1);
}
