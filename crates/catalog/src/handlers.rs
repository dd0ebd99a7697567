//! Domain event handlers registered by the catalog.
//!
//! The audit trail is written through the operation's unit of work, so an
//! entry exists exactly when the change it describes was committed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use common::AggregateId;
use domain::{DomainEvent, MediaStatus, VideoEvent};
use mediator::{BoxError, DomainEventHandler};
use serde::{Deserialize, Serialize};
use unit_of_work::{InMemoryTransactionProvider, PgTransactionProvider, UnitOfWork};

use crate::{CatalogError, Result};

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub video_id: AggregateId,
    pub event_type: String,
    pub detail: String,
}

impl AuditEntry {
    /// Describes one video event.
    pub fn from_event(event: &VideoEvent) -> Self {
        let detail = match event {
            VideoEvent::VideoCreated(data) => format!("created \"{}\"", data.title),
            VideoEvent::VideoAudioMediaReplaced(data) => {
                format!("{} replaced with {}", data.media_kind, data.media.name)
            }
            VideoEvent::VideoMediaStatusChanged(data) => {
                format!("{} {} -> {}", data.media_kind, data.from, data.to)
            }
        };
        Self {
            video_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            detail,
        }
    }
}

/// Storage of audit entries.
///
/// Appends join the active transaction of the unit of work the log was
/// built on; reads return committed entries only.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Committed entries of one video, oldest first.
    async fn entries_for(&self, video_id: AggregateId) -> Result<Vec<AuditEntry>>;
}

/// Audit log over the in-memory transactional store, keyed
/// `audit/{video_id}/{sequence}`.
pub struct InMemoryAuditLog {
    uow: Arc<UnitOfWork<InMemoryTransactionProvider, VideoEvent>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryAuditLog {
    /// Creates a log; `sequence` must be shared by every log over the same
    /// store so keys never collide.
    pub fn new(
        uow: Arc<UnitOfWork<InMemoryTransactionProvider, VideoEvent>>,
        sequence: Arc<AtomicU64>,
    ) -> Self {
        Self { uow, sequence }
    }
}

fn prefix(video_id: AggregateId) -> String {
    format!("audit/{video_id}/")
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let key = format!("{}{sequence:020}", prefix(entry.video_id));
        let value = serde_json::to_value(&entry)?;
        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                self.uow
                    .with_transaction(|transaction| transaction.put(key, value))
                    .await?;
                Ok(())
            })
            .await
    }

    async fn entries_for(&self, video_id: AggregateId) -> Result<Vec<AuditEntry>> {
        let provider = self.uow.provider();
        let mut entries = Vec::new();
        for key in provider.keys_with_prefix(&prefix(video_id)).await {
            if let Some(value) = provider.get(&key).await {
                entries.push(serde_json::from_value(value)?);
            }
        }
        Ok(entries)
    }
}

/// Audit log over the `audit_entries` table.
pub struct PgAuditLog {
    uow: Arc<UnitOfWork<PgTransactionProvider, VideoEvent>>,
}

impl PgAuditLog {
    pub fn new(uow: Arc<UnitOfWork<PgTransactionProvider, VideoEvent>>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        let payload = serde_json::to_value(&entry)?;
        self.uow
            .do_work::<_, CatalogError, _, _>(|| async {
                let mut transaction = self.uow.transaction().await?;
                sqlx::query("INSERT INTO audit_entries (video_id, entry) VALUES ($1, $2)")
                    .bind(entry.video_id.as_uuid())
                    .bind(&payload)
                    .execute(&mut **transaction)
                    .await?;
                Ok(())
            })
            .await
    }

    async fn entries_for(&self, video_id: AggregateId) -> Result<Vec<AuditEntry>> {
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT entry FROM audit_entries WHERE video_id = $1 ORDER BY id ASC",
        )
        .bind(video_id.as_uuid())
        .fetch_all(self.uow.provider().pool())
        .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CatalogError::from))
            .collect()
    }
}

/// Records every video event in an [`AuditLog`] inside the business
/// transaction.
pub struct VideoAuditTrail {
    log: Arc<dyn AuditLog>,
}

impl VideoAuditTrail {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl DomainEventHandler<VideoEvent> for VideoAuditTrail {
    fn name(&self) -> &'static str {
        "video_audit_trail"
    }

    async fn handle(&self, event: &VideoEvent) -> std::result::Result<(), BoxError> {
        let entry = AuditEntry::from_event(event);

        match event {
            VideoEvent::VideoMediaStatusChanged(data) if data.to == MediaStatus::Failed => {
                tracing::warn!(
                    video_id = %entry.video_id,
                    media_kind = %data.media_kind,
                    "encoding failed"
                );
            }
            _ => tracing::info!(
                video_id = %entry.video_id,
                event_type = %entry.event_type,
                detail = %entry.detail,
                "video audit"
            ),
        }

        self.log.append(entry).await?;
        Ok(())
    }
}
