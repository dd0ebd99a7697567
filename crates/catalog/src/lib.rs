//! Video catalog wiring.
//!
//! Assembles the storage backend, the event mediator and the message
//! transport into the video use cases, with:
//! - [`storage`]: in-memory and PostgreSQL backends
//! - [`config`]: environment configuration
//! - [`telemetry`]: tracing and Prometheus setup for the binary
//! - [`transport`]: the message transport and the integration event publisher
//! - [`relations`]: existence checks for categories, genres and cast members

pub mod config;
pub mod error;
pub mod handlers;
pub mod relations;
pub mod repository;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod use_cases;

use std::sync::Arc;

use domain::{CastMemberId, CategoryId, GenreId, VideoEvent, VideoEventKind};
use mediator::{DomainEventHandler, EventMediator, IntegrationEventHandler};
use unit_of_work::PgTransactionProvider;

pub use config::{Config, LogFormat};
pub use error::{CatalogError, Result};
pub use handlers::{AuditEntry, AuditLog, InMemoryAuditLog, PgAuditLog, VideoAuditTrail};
pub use relations::{
    InMemoryRelatedEntityRepository, RelatedEntityRepository, RelatedId, VideoRelationsValidator,
};
pub use repository::{InMemoryVideoRepository, PgVideoRepository, SharedVideo, VideoRepository};
pub use storage::{InMemoryStorage, PgStorage, Storage};
pub use transport::{
    InMemoryMessageTransport, IntegrationEventPublisher, MessageTransport, PublishedMessage,
    TransportError,
};
pub use use_cases::{
    CreateVideoInput, CreateVideoOutput, ProcessAudioVideoMediaInput,
    ProcessAudioVideoMediaOutput, UploadAudioVideoMediaInput, VideoUseCases,
};

/// Registers the catalog's handlers on a new mediator.
///
/// Every video event goes to `audit`; `VideoCreated` and
/// `VideoAudioMediaReplaced` go to `publisher` after commit.
pub fn build_mediator(
    audit: Arc<dyn DomainEventHandler<VideoEvent>>,
    publisher: Arc<dyn IntegrationEventHandler>,
) -> EventMediator<VideoEvent> {
    let mut mediator = EventMediator::new();
    for kind in VideoEventKind::ALL {
        mediator.register(kind, Arc::clone(&audit));
    }
    mediator
        .register_integration(VideoEventKind::VideoCreated, Arc::clone(&publisher))
        .register_integration(VideoEventKind::VideoAudioMediaReplaced, publisher);
    mediator
}

/// A fully wired catalog over one storage backend.
///
/// Related entities and the message transport are kept in memory; videos
/// and their audit trail live in the backend.
pub struct Catalog<S: Storage> {
    pub videos: VideoUseCases<S>,
    pub categories: Arc<InMemoryRelatedEntityRepository<CategoryId>>,
    pub genres: Arc<InMemoryRelatedEntityRepository<GenreId>>,
    pub cast_members: Arc<InMemoryRelatedEntityRepository<CastMemberId>>,
    pub transport: Arc<InMemoryMessageTransport>,
}

impl<S: Storage> Catalog<S> {
    /// Wires the use cases over `storage`.
    pub fn new(config: &Config, storage: S) -> Self {
        let transport = Arc::new(InMemoryMessageTransport::new());
        let publisher = Arc::new(IntegrationEventPublisher::new(
            Arc::clone(&transport),
            config.exchange.as_str(),
        ));

        let categories = Arc::new(InMemoryRelatedEntityRepository::new());
        let genres = Arc::new(InMemoryRelatedEntityRepository::new());
        let cast_members = Arc::new(InMemoryRelatedEntityRepository::new());
        let relations = VideoRelationsValidator::new(
            categories.clone(),
            genres.clone(),
            cast_members.clone(),
        );

        let videos = VideoUseCases::new(storage, publisher, relations);
        tracing::debug!(exchange = %config.exchange, "catalog assembled");

        Self {
            videos,
            categories,
            genres,
            cast_members,
            transport,
        }
    }

    /// Returns the transaction provider of the backend.
    pub fn provider(&self) -> &Arc<S::Provider> {
        self.videos.storage().provider()
    }
}

impl Catalog<InMemoryStorage> {
    /// Builds a catalog storing videos in memory.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(config, InMemoryStorage::new())
    }
}

impl Catalog<PgStorage> {
    /// Builds a catalog storing videos in PostgreSQL.
    pub fn postgres(config: &Config, provider: PgTransactionProvider) -> Self {
        Self::new(config, PgStorage::new(provider))
    }
}
