//! Video aggregate and related types.

mod aggregate;
mod events;
mod media;
mod value_objects;

pub use aggregate::{CreateVideoProps, TITLE_MAX_LENGTH, Video, VideoSnapshot};
pub use events::{
    VideoAudioMediaReplacedData, VideoCreatedData, VideoEvent, VideoEventKind,
    VideoMediaStatusChangedData,
};
pub use media::{AudioVideoMedia, MediaKind, MediaStatus};
pub use value_objects::{CastMemberId, CategoryId, GenreId};

use thiserror::Error;

/// Errors that can occur during video operations.
#[derive(Debug, Error)]
pub enum VideoError {
    /// Media asset is not in a state that allows the transition.
    #[error("Invalid media transition: cannot move from {from} to {to}")]
    InvalidMediaTransition { from: MediaStatus, to: MediaStatus },

    /// The video has no media of the requested kind.
    #[error("Video has no {kind} media")]
    MediaNotFound { kind: MediaKind },
}
