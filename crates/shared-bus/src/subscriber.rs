//! # Event Subscriber
//!
//! Subscription side of the bus.
//!
//! The broadcast channel delivers in publish order, but publishers run after
//! their commit and can race each other. Each subscription therefore keeps a
//! per-record version watermark and drops any event for a record at or below
//! the last version it delivered, so a client never sees an older status
//! after a newer one.

use crate::events::{EventFilter, GateEvent};
use shared_types::RecordId;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

pub(crate) type SubscriptionCounts = Arc<RwLock<HashMap<String, usize>>>;

/// Filter plus per-record ordering watermark.
#[derive(Debug)]
struct Admission {
    filter: EventFilter,
    watermarks: HashMap<RecordId, u64>,
}

impl Admission {
    fn new(filter: EventFilter) -> Self {
        Self {
            filter,
            watermarks: HashMap::new(),
        }
    }

    fn admit(&mut self, event: &GateEvent) -> bool {
        if !self.filter.matches(event) {
            return false;
        }
        let Some((record_id, version)) = event.ordering_key() else {
            return true;
        };
        match self.watermarks.get(&record_id) {
            Some(&seen) if version <= seen => {
                debug!(record_id = %record_id, version, seen, "Dropping stale event");
                false
            }
            _ => {
                self.watermarks.insert(record_id, version);
                true
            }
        }
    }
}

/// Decrements the audience count when the subscription goes away.
struct CountGuard {
    counts: SubscriptionCounts,
    audience: String,
}

impl Drop for CountGuard {
    fn drop(&mut self) {
        let Ok(mut counts) = self.counts.write() else {
            return;
        };
        if let Some(count) = counts.get_mut(&self.audience) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.audience);
            }
        }
        debug!(audience = %self.audience, "Subscription dropped");
    }
}

/// A subscription handle for receiving events.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    receiver: broadcast::Receiver<GateEvent>,
    admission: Admission,
    _guard: CountGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<GateEvent>,
        filter: EventFilter,
        counts: SubscriptionCounts,
    ) -> Self {
        let audience = filter.audience();
        Self {
            receiver,
            admission: Admission::new(filter),
            _guard: CountGuard { counts, audience },
        }
    }

    /// Receive the next admitted event, or `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<GateEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                    continue;
                }
            };

            if self.admission.admit(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next admitted event without blocking.
    pub fn try_recv(&mut self) -> Result<Option<GateEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.admission.admit(&event) {
                return Ok(Some(event));
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.admission.filter
    }
}

/// A `Stream` over a subscription, for use with stream combinators.
pub struct EventStream {
    inner: BroadcastStream<GateEvent>,
    admission: Admission,
    _guard: CountGuard,
}

impl EventStream {
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription {
            receiver,
            admission,
            _guard,
        } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            admission,
            _guard,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.admission.filter
    }
}

impl Stream for EventStream {
    type Item = GateEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if this.admission.admit(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Stream lagged, some events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
