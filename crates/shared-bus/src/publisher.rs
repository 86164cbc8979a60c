//! # Event Publisher
//!
//! Publishing side of the bus. Publishing is fire-and-forget: a send with no
//! subscribers is logged and dropped, never an error for the caller.

use crate::events::{EventFilter, GateEvent};
use crate::subscriber::{EventStream, Subscription, SubscriptionCounts};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Outbound event-emission interface called after each committed write.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns the number of receivers it reached.
    async fn publish(&self, event: GateEvent) -> usize;

    /// Total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Single-process only; a multi-node deployment would put a message queue or
/// webhook behind `EventPublisher` instead.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<GateEvent>,

    /// Active subscription count by audience (`user:<id>` or `dashboard`).
    subscriptions: SubscriptionCounts,

    events_published: AtomicU64,

    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(filter.audience()).or_insert(0) += 1;
        }

        debug!(topics = ?filter.topics, audience = %filter.audience(), "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone())
    }

    /// Convenience wrapper returning an `EventStream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live subscriptions for one audience key.
    #[must_use]
    pub fn audience_count(&self, audience: &str) -> usize {
        self.subscriptions
            .read()
            .ok()
            .and_then(|subs| subs.get(audience).copied())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: GateEvent) -> usize {
        let topic = event.topic();

        // Counted even when nobody is listening.
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(topic = ?topic, receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(e) => {
                warn!(topic = ?topic, error = %e, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

/// Publisher that drops everything. For wiring without realtime clients.
#[derive(Debug, Default)]
pub struct NoOpPublisher {
    count: AtomicU64,
}

#[async_trait]
impl EventPublisher for NoOpPublisher {
    async fn publish(&self, _event: GateEvent) -> usize {
        self.count.fetch_add(1, Ordering::Relaxed);
        0
    }

    fn events_published(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
