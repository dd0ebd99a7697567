//! Aggregate base: identity, event buffer and intra-aggregate reactors.

use common::AggregateId;

use crate::event::{DomainEvent, EventBuffer, EventSequence, RecordedEvent};

/// A reactor keeps derived state of an aggregate consistent with the event
/// that was just recorded. It only touches the aggregate's own fields.
pub type Reactor<A> = fn(&mut A, &<A as AggregateRoot>::Event);

/// Reactors of one aggregate instance, keyed by event kind.
pub struct Reactors<A: AggregateRoot> {
    entries: Vec<(<A::Event as DomainEvent>::Kind, Reactor<A>)>,
}

impl<A: AggregateRoot> Reactors<A> {
    /// Creates an empty reactor table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Subscribes `handler` to events of `kind`.
    ///
    /// Handlers for the same kind run in registration order.
    pub fn register_handler(
        &mut self,
        kind: <A::Event as DomainEvent>::Kind,
        handler: Reactor<A>,
    ) -> &mut Self {
        self.entries.push((kind, handler));
        self
    }

    /// Returns the handlers subscribed to `kind`, in registration order.
    pub fn handlers_for(&self, kind: <A::Event as DomainEvent>::Kind) -> Vec<Reactor<A>> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| *handler)
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: AggregateRoot> Default for Reactors<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: AggregateRoot> Clone for Reactors<A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<A: AggregateRoot> std::fmt::Debug for Reactors<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(kind, _)| kind))
            .finish()
    }
}

/// A uniquely identified, mutable domain object that buffers the events it
/// produces.
///
/// Mutators record facts through [`AggregateRoot::apply_event`]; the
/// buffered events are later read by the mediator and never leave the
/// aggregate on their own.
pub trait AggregateRoot: Send + Sync + Sized + 'static {
    /// The closed set of events this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identity.
    fn id(&self) -> AggregateId;

    /// Returns the event buffer.
    fn events(&self) -> &EventBuffer<Self::Event>;

    /// Returns the event buffer mutably.
    fn events_mut(&mut self) -> &mut EventBuffer<Self::Event>;

    /// Returns the reactors registered on this instance.
    fn reactors(&self) -> &Reactors<Self>;

    /// Returns the reactors registered on this instance mutably.
    fn reactors_mut(&mut self) -> &mut Reactors<Self>;

    /// Subscribes a reactor to events of `kind` on this instance.
    fn register_handler(
        &mut self,
        kind: <Self::Event as DomainEvent>::Kind,
        handler: Reactor<Self>,
    ) {
        self.reactors_mut().register_handler(kind, handler);
    }

    /// Records `event` and synchronously runs the reactors for its kind.
    ///
    /// Returns `None` and runs nothing if an equal event is already buffered.
    fn apply_event(&mut self, event: Self::Event) -> Option<EventSequence> {
        let kind = event.kind();
        let sequence = self.events_mut().record(event.clone())?;
        for handler in self.reactors().handlers_for(kind) {
            handler(self, &event);
        }
        Some(sequence)
    }

    /// Marks the event at `sequence` as handed to the mediator.
    fn mark_event_as_dispatched(&mut self, sequence: EventSequence) -> bool {
        self.events_mut().mark_dispatched(sequence)
    }

    /// Events recorded but not yet dispatched, in buffer order.
    fn uncommitted_events(&self) -> Vec<RecordedEvent<Self::Event>> {
        self.events().uncommitted().cloned().collect()
    }

    /// Drops every buffered event.
    fn clear_events(&mut self) {
        self.events_mut().clear();
    }
}

/// Object-safe view of an aggregate's identity and event buffer.
///
/// Lets the unit of work and the mediator handle aggregates of different
/// types that share one event enum.
pub trait EventSource<E: DomainEvent>: Send + Sync {
    /// Identity of the underlying aggregate.
    fn source_id(&self) -> AggregateId;

    /// Type name of the underlying aggregate.
    fn source_type(&self) -> &'static str;

    /// The aggregate's event buffer.
    fn buffer(&self) -> &EventBuffer<E>;

    /// The aggregate's event buffer, mutably.
    fn buffer_mut(&mut self) -> &mut EventBuffer<E>;
}

impl<A: AggregateRoot> EventSource<A::Event> for A {
    fn source_id(&self) -> AggregateId {
        self.id()
    }

    fn source_type(&self) -> &'static str {
        A::aggregate_type()
    }

    fn buffer(&self) -> &EventBuffer<A::Event> {
        self.events()
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer<A::Event> {
        self.events_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Debug, Clone, PartialEq)]
    enum CounterEvent {
        Incremented { id: AggregateId, by: i64 },
        Reset { id: AggregateId },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum CounterEventKind {
        Incremented,
        Reset,
    }

    impl DomainEvent for CounterEvent {
        type Kind = CounterEventKind;

        fn kind(&self) -> CounterEventKind {
            match self {
                CounterEvent::Incremented { .. } => CounterEventKind::Incremented,
                CounterEvent::Reset { .. } => CounterEventKind::Reset,
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "CounterIncremented",
                CounterEvent::Reset { .. } => "CounterReset",
            }
        }

        fn aggregate_id(&self) -> AggregateId {
            match self {
                CounterEvent::Incremented { id, .. } | CounterEvent::Reset { id } => *id,
            }
        }

        fn occurred_on(&self) -> DateTime<Utc> {
            DateTime::<Utc>::UNIX_EPOCH
        }
    }

    #[derive(Debug, Clone)]
    struct Counter {
        id: AggregateId,
        total: i64,
        trace: Vec<&'static str>,
        events: EventBuffer<CounterEvent>,
        reactors: Reactors<Counter>,
    }

    impl Counter {
        fn new() -> Self {
            let mut counter = Self {
                id: AggregateId::new(),
                total: 0,
                trace: Vec::new(),
                events: EventBuffer::new(),
                reactors: Reactors::new(),
            };
            counter.register_handler(CounterEventKind::Incremented, |c, e| {
                if let CounterEvent::Incremented { by, .. } = e {
                    c.total += by;
                }
                c.trace.push("sum");
            });
            counter.register_handler(CounterEventKind::Incremented, |c, _| c.trace.push("audit"));
            counter.register_handler(CounterEventKind::Reset, |c, _| c.total = 0);
            counter
        }

        fn increment(&mut self, by: i64) {
            self.apply_event(CounterEvent::Incremented { id: self.id, by });
        }
    }

    impl AggregateRoot for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> AggregateId {
            self.id
        }

        fn events(&self) -> &EventBuffer<CounterEvent> {
            &self.events
        }

        fn events_mut(&mut self) -> &mut EventBuffer<CounterEvent> {
            &mut self.events
        }

        fn reactors(&self) -> &Reactors<Self> {
            &self.reactors
        }

        fn reactors_mut(&mut self) -> &mut Reactors<Self> {
            &mut self.reactors
        }
    }

    #[test]
    fn apply_event_runs_reactors_in_registration_order() {
        let mut counter = Counter::new();
        counter.increment(5);

        assert_eq!(counter.total, 5);
        assert_eq!(counter.trace, vec!["sum", "audit"]);
        assert_eq!(counter.events().len(), 1);
    }

    #[test]
    fn reactors_only_fire_for_matching_kind() {
        let mut counter = Counter::new();
        counter.increment(3);
        counter.apply_event(CounterEvent::Reset { id: counter.id });

        assert_eq!(counter.total, 0);
        assert_eq!(counter.trace, vec!["sum", "audit"]);
    }

    #[test]
    fn duplicate_event_is_ignored_and_reactors_do_not_rerun() {
        let mut counter = Counter::new();
        counter.increment(2);
        counter.increment(2);

        assert_eq!(counter.total, 2);
        assert_eq!(counter.events().len(), 1);
    }

    #[test]
    fn uncommitted_events_shrink_as_events_are_dispatched() {
        let mut counter = Counter::new();
        counter.increment(1);
        counter.increment(2);

        let pending = counter.uncommitted_events();
        assert_eq!(pending.len(), 2);
        assert!(counter.mark_event_as_dispatched(pending[0].sequence));
        assert_eq!(counter.uncommitted_events().len(), 1);

        counter.clear_events();
        assert!(counter.uncommitted_events().is_empty());
        assert!(counter.events().is_empty());
    }

    #[test]
    fn event_source_exposes_identity_and_buffer() {
        let mut counter = Counter::new();
        counter.increment(1);

        let source: &mut dyn EventSource<CounterEvent> = &mut counter;
        assert_eq!(source.source_type(), "Counter");
        assert_eq!(source.buffer().len(), 1);
        let first = source.buffer().iter().next().unwrap().sequence;
        assert!(source.buffer_mut().mark_dispatched(first));
        assert_eq!(counter.uncommitted_events().len(), 0);
    }
}
