//! Domain layer for the video catalog.
//!
//! This crate provides the core domain abstractions including:
//! - AggregateRoot trait with a buffered event log and per-instance reactors
//! - DomainEvent trait and the integration events derived from it
//! - Video aggregate whose publication state follows its media

pub mod aggregate;
pub mod error;
pub mod event;
pub mod video;

pub use aggregate::{AggregateRoot, EventSource, Reactor, Reactors};
pub use error::DomainError;
pub use event::{DomainEvent, EventBuffer, EventSequence, IntegrationEvent, RecordedEvent};
pub use video::{
    AudioVideoMedia, CastMemberId, CategoryId, CreateVideoProps, GenreId, MediaKind, MediaStatus,
    Video, VideoAudioMediaReplacedData, VideoCreatedData, VideoError, VideoEvent, VideoEventKind,
    VideoMediaStatusChangedData, VideoSnapshot,
};
