//! Domain events, integration events and the per-aggregate event buffer.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

/// An immutable fact recorded by an aggregate.
///
/// Each aggregate defines its events as one closed enum. `Kind` is the
/// fieldless mirror of that enum and is what handlers subscribe to, so a
/// handler can only ever be registered for an event that exists.
pub trait DomainEvent: Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Fieldless discriminant used for handler routing.
    type Kind: Debug + Copy + Eq + Hash + Send + Sync + 'static;

    /// Returns the routing discriminant of this event.
    fn kind(&self) -> Self::Kind;

    /// Returns the event type name, used for logging and metrics labels.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate this event belongs to.
    fn aggregate_id(&self) -> AggregateId;

    /// When the fact happened.
    fn occurred_on(&self) -> DateTime<Utc>;

    /// Schema version of the event payload. Starts at 1.
    fn event_version(&self) -> u32 {
        1
    }

    /// Converts to the externally visible form, if this fact is published
    /// outside the process at all.
    fn integration_event(&self) -> Option<IntegrationEvent> {
        None
    }
}

/// Flattened, serialization-ready event meant for external transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEvent {
    /// Stable external name, e.g. `video.created`.
    pub event_name: String,
    /// Schema version of `payload`.
    pub event_version: u32,
    /// When the underlying domain fact happened.
    pub occurred_on: DateTime<Utc>,
    /// Event-specific body.
    pub payload: serde_json::Value,
}

impl IntegrationEvent {
    /// Creates an integration event.
    pub fn new(
        event_name: impl Into<String>,
        event_version: u32,
        occurred_on: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            event_version,
            occurred_on,
            payload,
        }
    }
}

/// Position of an event inside one aggregate instance's buffer.
///
/// Sequences start at 1 and are never reused by the same buffer, not even
/// after [`EventBuffer::clear`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventSequence(u64);

impl EventSequence {
    /// Creates a sequence from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The "nothing recorded yet" sequence (0).
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event together with its position in the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent<E> {
    /// Position in the owning buffer.
    pub sequence: EventSequence,
    /// The event itself.
    pub event: E,
}

/// Ordered buffer of the events an aggregate produced since creation or
/// since the last clear.
///
/// Dispatch is tracked with a watermark: every event whose sequence is at or
/// below it has been handed to the mediator. The watermark never points past
/// the last recorded event, so the dispatched events are always a prefix of
/// the buffer.
#[derive(Debug, Clone)]
pub struct EventBuffer<E> {
    records: Vec<RecordedEvent<E>>,
    last_sequence: EventSequence,
    dispatched: EventSequence,
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            last_sequence: EventSequence::initial(),
            dispatched: EventSequence::initial(),
        }
    }
}

impl<E: PartialEq> EventBuffer<E> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` and returns its sequence.
    ///
    /// Returns `None` without recording anything if an equal event is
    /// already buffered.
    pub fn record(&mut self, event: E) -> Option<EventSequence> {
        if self.records.iter().any(|r| r.event == event) {
            return None;
        }
        self.last_sequence = self.last_sequence.next();
        self.records.push(RecordedEvent {
            sequence: self.last_sequence,
            event,
        });
        Some(self.last_sequence)
    }

    /// Looks up a buffered event by sequence.
    pub fn get(&self, sequence: EventSequence) -> Option<&RecordedEvent<E>> {
        self.records.iter().find(|r| r.sequence == sequence)
    }

    /// Iterates every buffered event in order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordedEvent<E>> {
        self.records.iter()
    }

    /// Iterates the events not yet handed to the mediator, in order.
    pub fn uncommitted(&self) -> impl Iterator<Item = &RecordedEvent<E>> {
        let dispatched = self.dispatched;
        self.records.iter().filter(move |r| r.sequence > dispatched)
    }

    /// Returns the oldest event not yet handed to the mediator.
    pub fn next_undispatched(&self) -> Option<&RecordedEvent<E>> {
        self.uncommitted().next()
    }

    /// Marks the event at `sequence`, and every event before it, as dispatched.
    ///
    /// Returns false when `sequence` is not buffered or already dispatched.
    pub fn mark_dispatched(&mut self, sequence: EventSequence) -> bool {
        if sequence <= self.dispatched || self.get(sequence).is_none() {
            return false;
        }
        self.dispatched = sequence;
        true
    }

    /// Returns true if the event at `sequence` has been dispatched.
    pub fn is_dispatched(&self, sequence: EventSequence) -> bool {
        sequence <= self.dispatched && self.get(sequence).is_some()
    }

    /// Number of buffered events that have been dispatched.
    pub fn dispatched_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.sequence <= self.dispatched)
            .count()
    }

    /// Drops every buffered event. Sequence numbering continues afterwards.
    pub fn clear(&mut self) {
        self.records.clear();
        self.dispatched = self.last_sequence;
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence of the most recently recorded event.
    pub fn last_sequence(&self) -> EventSequence {
        self.last_sequence
    }
}
