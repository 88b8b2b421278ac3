use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
struct Inner {
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,
    log: Vec<EventEnvelope>,
}

/// In-memory event store.
///
/// Keeps one ordered stream per aggregate plus a global append log, and
/// publishes every appended envelope to subscribers while the write lock is
/// held, so subscribers observe the same order as the log.
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
    publisher: broadcast::Sender<EventEnvelope>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a store whose subscription channel buffers `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (publisher, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            publisher,
        }
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;
        let batch_size = events.len();

        let mut inner = self.inner.write().await;

        let current_version = inner
            .streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Unique (aggregate, version) constraint.
        if first_new_version != current_version.next() {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);

        inner
            .streams
            .entry(aggregate_id)
            .or_default()
            .extend(events.iter().cloned());
        inner.log.extend(events.iter().cloned());

        for event in events {
            // No subscribers is not an error.
            let _ = self.publisher.send(event);
        }

        metrics::counter!("event_store_appended_total").increment(batch_size as u64);
        tracing::debug!(
            %aggregate_id,
            version = %last_version,
            count = batch_size,
            "Appended events"
        );

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.inner.read().await.log.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.publisher.subscribe()
    }
}
