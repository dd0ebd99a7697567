//! Video domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::event::{DomainEvent, IntegrationEvent};

use super::{AudioVideoMedia, CastMemberId, CategoryId, GenreId, MediaKind, MediaStatus};

/// Events that can occur on a video aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum VideoEvent {
    /// Video was registered in the catalog.
    VideoCreated(VideoCreatedData),

    /// The video file or the trailer was replaced by a new upload.
    VideoAudioMediaReplaced(VideoAudioMediaReplacedData),

    /// The encoder moved the video file or the trailer to a new status.
    VideoMediaStatusChanged(VideoMediaStatusChangedData),
}

/// Routing discriminant of [`VideoEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoEventKind {
    /// [`VideoEvent::VideoCreated`]
    VideoCreated,
    /// [`VideoEvent::VideoAudioMediaReplaced`]
    VideoAudioMediaReplaced,
    /// [`VideoEvent::VideoMediaStatusChanged`]
    VideoMediaStatusChanged,
}

impl VideoEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [VideoEventKind; 3] = [
        VideoEventKind::VideoCreated,
        VideoEventKind::VideoAudioMediaReplaced,
        VideoEventKind::VideoMediaStatusChanged,
    ];
}

impl DomainEvent for VideoEvent {
    type Kind = VideoEventKind;

    fn kind(&self) -> VideoEventKind {
        match self {
            VideoEvent::VideoCreated(_) => VideoEventKind::VideoCreated,
            VideoEvent::VideoAudioMediaReplaced(_) => VideoEventKind::VideoAudioMediaReplaced,
            VideoEvent::VideoMediaStatusChanged(_) => VideoEventKind::VideoMediaStatusChanged,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            VideoEvent::VideoCreated(_) => "VideoCreated",
            VideoEvent::VideoAudioMediaReplaced(_) => "VideoAudioMediaReplaced",
            VideoEvent::VideoMediaStatusChanged(_) => "VideoMediaStatusChanged",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            VideoEvent::VideoCreated(data) => data.video_id,
            VideoEvent::VideoAudioMediaReplaced(data) => data.video_id,
            VideoEvent::VideoMediaStatusChanged(data) => data.video_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            VideoEvent::VideoCreated(data) => data.occurred_on,
            VideoEvent::VideoAudioMediaReplaced(data) => data.occurred_on,
            VideoEvent::VideoMediaStatusChanged(data) => data.occurred_on,
        }
    }

    fn event_version(&self) -> u32 {
        match self {
            VideoEvent::VideoCreated(data) => data.event_version,
            VideoEvent::VideoAudioMediaReplaced(data) => data.event_version,
            VideoEvent::VideoMediaStatusChanged(data) => data.event_version,
        }
    }

    fn integration_event(&self) -> Option<IntegrationEvent> {
        match self {
            VideoEvent::VideoCreated(data) => Some(IntegrationEvent::new(
                "video.created",
                data.event_version,
                data.occurred_on,
                serde_json::json!({
                    "video_id": data.video_id,
                    "title": data.title,
                    "category_ids": data.category_ids,
                    "genre_ids": data.genre_ids,
                    "cast_member_ids": data.cast_member_ids,
                }),
            )),
            // The encoder subscribes to uploads; the resource id tells it
            // which sub-resource to report back on.
            VideoEvent::VideoAudioMediaReplaced(data) => Some(IntegrationEvent::new(
                "video.media.replaced",
                data.event_version,
                data.occurred_on,
                serde_json::json!({
                    "resource_id": format!("{}.{}", data.video_id, data.media_kind),
                    "file_path": data.media.raw_location,
                }),
            )),
            VideoEvent::VideoMediaStatusChanged(_) => None,
        }
    }
}

/// Data for VideoCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCreatedData {
    /// The new video.
    pub video_id: AggregateId,

    /// Title at creation time.
    pub title: String,

    /// Categories the video was filed under.
    pub category_ids: Vec<CategoryId>,

    /// Genres the video was filed under.
    pub genre_ids: Vec<GenreId>,

    /// Cast members credited on the video.
    pub cast_member_ids: Vec<CastMemberId>,

    /// When the video was created.
    pub occurred_on: DateTime<Utc>,

    /// Payload schema version.
    pub event_version: u32,
}

/// Data for VideoAudioMediaReplaced event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAudioMediaReplacedData {
    /// The video whose media was replaced.
    pub video_id: AggregateId,

    /// Which sub-resource was replaced.
    pub media_kind: MediaKind,

    /// The new asset.
    pub media: AudioVideoMedia,

    /// When the replacement happened.
    pub occurred_on: DateTime<Utc>,

    /// Payload schema version.
    pub event_version: u32,
}

/// Data for VideoMediaStatusChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMediaStatusChangedData {
    /// The video whose media changed.
    pub video_id: AggregateId,

    /// Which sub-resource changed.
    pub media_kind: MediaKind,

    /// Status before the change.
    pub from: MediaStatus,

    /// Status after the change.
    pub to: MediaStatus,

    /// When the change happened.
    pub occurred_on: DateTime<Utc>,

    /// Payload schema version.
    pub event_version: u32,
}

// Convenience constructors for events
impl VideoEvent {
    /// Creates a VideoCreated event.
    pub fn video_created(
        video_id: AggregateId,
        title: impl Into<String>,
        category_ids: Vec<CategoryId>,
        genre_ids: Vec<GenreId>,
        cast_member_ids: Vec<CastMemberId>,
    ) -> Self {
        VideoEvent::VideoCreated(VideoCreatedData {
            video_id,
            title: title.into(),
            category_ids,
            genre_ids,
            cast_member_ids,
            occurred_on: Utc::now(),
            event_version: 1,
        })
    }

    /// Creates a VideoAudioMediaReplaced event.
    pub fn media_replaced(
        video_id: AggregateId,
        media_kind: MediaKind,
        media: AudioVideoMedia,
    ) -> Self {
        VideoEvent::VideoAudioMediaReplaced(VideoAudioMediaReplacedData {
            video_id,
            media_kind,
            media,
            occurred_on: Utc::now(),
            event_version: 1,
        })
    }

    /// Creates a VideoMediaStatusChanged event.
    pub fn media_status_changed(
        video_id: AggregateId,
        media_kind: MediaKind,
        from: MediaStatus,
        to: MediaStatus,
    ) -> Self {
        VideoEvent::VideoMediaStatusChanged(VideoMediaStatusChangedData {
            video_id,
            media_kind,
            from,
            to,
            occurred_on: Utc::now(),
            event_version: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_kind() {
        let video_id = AggregateId::new();

        let event = VideoEvent::video_created(video_id, "Title", vec![], vec![], vec![]);
        assert_eq!(event.event_type(), "VideoCreated");
        assert_eq!(event.kind(), VideoEventKind::VideoCreated);
        assert_eq!(event.aggregate_id(), video_id);
        assert_eq!(event.event_version(), 1);

        let media = AudioVideoMedia::create("a.mp4", "raw/a.mp4");
        let event = VideoEvent::media_replaced(video_id, MediaKind::Trailer, media);
        assert_eq!(event.event_type(), "VideoAudioMediaReplaced");
        assert_eq!(event.kind(), VideoEventKind::VideoAudioMediaReplaced);

        let event = VideoEvent::media_status_changed(
            video_id,
            MediaKind::Video,
            MediaStatus::Pending,
            MediaStatus::Processing,
        );
        assert_eq!(event.event_type(), "VideoMediaStatusChanged");
        assert_eq!(event.kind(), VideoEventKind::VideoMediaStatusChanged);
    }

    #[test]
    fn test_media_replaced_integration_event() {
        let video_id = AggregateId::new();
        let media = AudioVideoMedia::create("a.mp4", "raw/a.mp4");
        let event = VideoEvent::media_replaced(video_id, MediaKind::Video, media);

        let integration = event.integration_event().unwrap();
        assert_eq!(integration.event_name, "video.media.replaced");
        assert_eq!(integration.event_version, 1);
        assert_eq!(integration.occurred_on, event.occurred_on());
        assert_eq!(
            integration.payload["resource_id"],
            format!("{video_id}.video")
        );
        assert_eq!(integration.payload["file_path"], "raw/a.mp4");
    }

    #[test]
    fn test_status_change_has_no_integration_event() {
        let event = VideoEvent::media_status_changed(
            AggregateId::new(),
            MediaKind::Video,
            MediaStatus::Processing,
            MediaStatus::Completed,
        );
        assert!(event.integration_event().is_none());
    }

    #[test]
    fn test_event_serialization() {
        let video_id = AggregateId::new();
        let category = CategoryId::new();
        let event = VideoEvent::video_created(video_id, "Title", vec![category], vec![], vec![]);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("VideoCreated"));

        let deserialized: VideoEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
