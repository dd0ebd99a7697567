//! Storage backends for the catalog.
//!
//! A backend owns the transaction provider and builds the repositories of
//! one operation over that operation's unit of work.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use domain::VideoEvent;
use unit_of_work::{
    InMemoryTransactionProvider, PgTransactionProvider, TransactionProvider, UnitOfWork,
};

use crate::handlers::{AuditLog, InMemoryAuditLog, PgAuditLog};
use crate::repository::{InMemoryVideoRepository, PgVideoRepository, VideoRepository};

pub trait Storage: Send + Sync + 'static {
    type Provider: TransactionProvider;

    fn provider(&self) -> &Arc<Self::Provider>;

    /// Video repository writing through `uow`.
    fn videos(
        &self,
        uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>,
    ) -> Arc<dyn VideoRepository>;

    /// Audit log writing through `uow`.
    fn audit_log(&self, uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>) -> Arc<dyn AuditLog>;
}

/// In-memory backend.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    provider: Arc<InMemoryTransactionProvider>,
    audit_sequence: Arc<AtomicU64>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    type Provider = InMemoryTransactionProvider;

    fn provider(&self) -> &Arc<InMemoryTransactionProvider> {
        &self.provider
    }

    fn videos(
        &self,
        uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>,
    ) -> Arc<dyn VideoRepository> {
        Arc::new(InMemoryVideoRepository::new(uow))
    }

    fn audit_log(&self, uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>) -> Arc<dyn AuditLog> {
        Arc::new(InMemoryAuditLog::new(uow, Arc::clone(&self.audit_sequence)))
    }
}

/// PostgreSQL backend.
#[derive(Clone)]
pub struct PgStorage {
    provider: Arc<PgTransactionProvider>,
}

impl PgStorage {
    pub fn new(provider: PgTransactionProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl Storage for PgStorage {
    type Provider = PgTransactionProvider;

    fn provider(&self) -> &Arc<PgTransactionProvider> {
        &self.provider
    }

    fn videos(
        &self,
        uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>,
    ) -> Arc<dyn VideoRepository> {
        Arc::new(PgVideoRepository::new(uow))
    }

    fn audit_log(&self, uow: Arc<UnitOfWork<Self::Provider, VideoEvent>>) -> Arc<dyn AuditLog> {
        Arc::new(PgAuditLog::new(uow))
    }
}
