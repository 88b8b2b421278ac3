//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is recorded on the stored envelope and used for routing.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Generate events from commands
/// - Apply events to update state (deterministic, side-effect free)
pub trait Aggregate: Default + Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used as the stream family on stored envelopes.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current version of the aggregate.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading or appending events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Implementations validate the event before touching any field, so a
    /// rejected event leaves the aggregate unchanged.
    fn apply(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// Applies multiple events in sequence.
    ///
    /// Either every event is applied or the aggregate is left as it was.
    fn apply_events(
        &mut self,
        events: impl IntoIterator<Item = Self::Event>,
    ) -> Result<(), Self::Error> {
        let mut next = self.clone();
        for event in events {
            next.apply(event)?;
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created,
        Added { value: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created => "TestCreated",
                TestEvent::Added { .. } => "TestAdded",
            }
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Counter {
        id: Option<AggregateId>,
        total: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    enum CounterError {
        #[error("counter not created")]
        NotCreated,
        #[error("negative amount: {0}")]
        Negative(i32),
    }

    impl Aggregate for Counter {
        type Event = TestEvent;
        type Error = CounterError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) -> Result<(), Self::Error> {
            match event {
                TestEvent::Created => {
                    self.id.get_or_insert_with(AggregateId::new);
                }
                TestEvent::Added { value } => {
                    if self.id.is_none() {
                        return Err(CounterError::NotCreated);
                    }
                    if value < 0 {
                        return Err(CounterError::Negative(value));
                    }
                    self.total += value;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn apply_events_in_order() {
        let mut counter = Counter::default();
        counter
            .apply_events(vec![
                TestEvent::Created,
                TestEvent::Added { value: 2 },
                TestEvent::Added { value: 40 },
            ])
            .unwrap();

        assert!(counter.id().is_some());
        assert_eq!(counter.total, 42);
    }

    #[test]
    fn failed_batch_leaves_aggregate_unchanged() {
        let mut counter = Counter::default();
        counter.apply(TestEvent::Created).unwrap();
        counter.apply(TestEvent::Added { value: 1 }).unwrap();

        let result = counter.apply_events(vec![
            TestEvent::Added { value: 5 },
            TestEvent::Added { value: -3 },
        ]);

        assert!(matches!(result, Err(CounterError::Negative(-3))));
        assert_eq!(counter.total, 1);
    }

    #[test]
    fn event_before_creation_is_rejected() {
        let mut counter = Counter::default();
        let result = counter.apply(TestEvent::Added { value: 5 });

        assert!(matches!(result, Err(CounterError::NotCreated)));
        assert!(counter.id().is_none());
        assert_eq!(counter.total, 0);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(TestEvent::Created.event_type(), "TestCreated");
        assert_eq!(TestEvent::Added { value: 1 }.event_type(), "TestAdded");
    }
}
