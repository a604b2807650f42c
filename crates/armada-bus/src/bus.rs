//! The bus contract and the in-process implementation.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{BusEvent, Topic};

/// Result type alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur publishing to the bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: Topic, reason: String },
}

/// Publish/subscribe over the closed topic set.
///
/// Delivery is at-least-once from the consumer's perspective: transports
/// may redeliver, and consumers must tolerate duplicates. Publishing to a
/// topic nobody subscribes to is not an error — events are droppable until
/// someone cares.
pub trait EventBus: Send + Sync {
    /// Publish an event on its topic; returns the number of receivers it
    /// reached.
    fn publish(&self, event: BusEvent) -> BusResult<usize>;

    /// Subscribe to a topic. Events published after this call are delivered
    /// to the returned receiver.
    fn subscribe(&self, topic: Topic) -> broadcast::Receiver<BusEvent>;
}

/// In-process bus: one broadcast channel per topic.
///
/// A slow consumer that lags past the channel capacity loses its oldest
/// events; that shows up as a `Lagged` recv error, and the drift poller's
/// next tick re-publishes anything that mattered.
pub struct InMemoryBus {
    channels: HashMap<Topic, broadcast::Sender<BusEvent>>,
}

impl InMemoryBus {
    const TOPICS: [Topic; 4] = [Topic::Job, Topic::HeartBeat, Topic::Schedule, Topic::Trigger];

    /// Create a bus with the given per-topic buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Self::TOPICS
            .into_iter()
            .map(|t| (t, broadcast::channel(capacity).0))
            .collect();
        Self { channels }
    }

    pub fn new() -> Self {
        Self::with_capacity(256)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for InMemoryBus {
    fn publish(&self, event: BusEvent) -> BusResult<usize> {
        let topic = event.topic();
        // Every topic's channel exists from construction; send only errors
        // when there are no receivers, which is fine.
        let sender = &self.channels[&topic];
        let delivered = sender.send(event).unwrap_or(0);
        debug!(%topic, delivered, "event published");
        Ok(delivered)
    }

    fn subscribe(&self, topic: Topic) -> broadcast::Receiver<BusEvent> {
        self.channels[&topic].subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_core::{JobAction, JobSpec, ObjectKind};

    fn job_event(id: &str) -> BusEvent {
        BusEvent::job(
            ObjectKind::Instance,
            Some("default"),
            JobSpec::new(id, JobAction::Update),
        )
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe(Topic::Job);

        let delivered = bus.publish(job_event("app")).unwrap();
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, job_event("app"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::new();
        let delivered = bus.publish(job_event("app")).unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = InMemoryBus::new();
        let mut job_rx = bus.subscribe(Topic::Job);
        let mut trigger_rx = bus.subscribe(Topic::Trigger);

        bus.publish(job_event("app")).unwrap();

        assert!(job_rx.try_recv().is_ok());
        assert!(trigger_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let bus = InMemoryBus::new();
        let mut a = bus.subscribe(Topic::Job);
        let mut b = bus.subscribe(Topic::Job);

        assert_eq!(bus.publish(job_event("app")).unwrap(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
