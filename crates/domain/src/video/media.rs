//! Audio/video sub-resources of a video and their encoding lifecycle.

use serde::{Deserialize, Serialize};

use super::VideoError;

/// Encoding state of a media asset.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──► Completed
///    │             │
///    └─────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    /// Uploaded, waiting for the encoder.
    #[default]
    Pending,

    /// Picked up by the encoder.
    Processing,

    /// Encoded and ready to stream (terminal state).
    Completed,

    /// Encoding failed (terminal state).
    Failed,
}

impl MediaStatus {
    /// Returns true if encoding can start in this state.
    pub fn can_process(&self) -> bool {
        matches!(self, MediaStatus::Pending)
    }

    /// Returns true if the asset can be marked as encoded in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, MediaStatus::Processing)
    }

    /// Returns true if the asset can be marked as failed in this state.
    pub fn can_fail(&self) -> bool {
        matches!(self, MediaStatus::Pending | MediaStatus::Processing)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MediaStatus::Completed | MediaStatus::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Processing => "processing",
            MediaStatus::Completed => "completed",
            MediaStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of the two replaceable sub-resources of a video an asset fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// The feature video file.
    Video,
    /// The trailer.
    Trailer,
}

impl MediaKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Trailer => "trailer",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An uploaded audio/video file and its encoding progress.
///
/// Value object: transitions return a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioVideoMedia {
    /// Original file name.
    pub name: String,
    /// Where the uploaded file is stored.
    pub raw_location: String,
    /// Where the encoded output is stored, once encoded.
    pub encoded_location: Option<String>,
    /// Encoding state.
    pub status: MediaStatus,
}

impl AudioVideoMedia {
    /// Creates a freshly uploaded, pending asset.
    pub fn create(name: impl Into<String>, raw_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_location: raw_location.into(),
            encoded_location: None,
            status: MediaStatus::Pending,
        }
    }

    /// Moves the asset to `Processing`.
    pub fn process(&self) -> Result<Self, VideoError> {
        if !self.status.can_process() {
            return Err(self.invalid_transition(MediaStatus::Processing));
        }
        Ok(Self {
            status: MediaStatus::Processing,
            ..self.clone()
        })
    }

    /// Moves the asset to `Completed`, recording where the encoded output lives.
    pub fn complete(&self, encoded_location: impl Into<String>) -> Result<Self, VideoError> {
        if !self.status.can_complete() {
            return Err(self.invalid_transition(MediaStatus::Completed));
        }
        Ok(Self {
            encoded_location: Some(encoded_location.into()),
            status: MediaStatus::Completed,
            ..self.clone()
        })
    }

    /// Moves the asset to `Failed`.
    pub fn fail(&self) -> Result<Self, VideoError> {
        if !self.status.can_fail() {
            return Err(self.invalid_transition(MediaStatus::Failed));
        }
        Ok(Self {
            status: MediaStatus::Failed,
            ..self.clone()
        })
    }

    /// Returns true once the encoded output is available.
    pub fn is_completed(&self) -> bool {
        self.status == MediaStatus::Completed
    }

    fn invalid_transition(&self, to: MediaStatus) -> VideoError {
        VideoError::InvalidMediaTransition {
            from: self.status,
            to,
        }
    }
}
