//! # Shared Bus - Realtime Notification Transport
//!
//! Carries committed purchase-lifecycle changes to the purchasing user's live
//! session and to operator dashboards.
//!
//! ```text
//! ┌──────────────────┐  publish()   ┌──────────────┐  subscribe()  ┌─────────────┐
//! │ DispositionEngine│ ───────────► │  Event Bus   │ ────────────► │ user session│
//! │ ReferralCredit   │              │ (broadcast)  │ ────────────► │ dashboards  │
//! └──────────────────┘              └──────────────┘               └─────────────┘
//! ```
//!
//! ## Delivery
//!
//! - Fire-and-forget from the writer's point of view; the store stays canonical.
//! - No global order across records.
//! - Per-record causal order: a subscription never yields an event for a
//!   record whose version is at or below one it already delivered.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, GateEvent, StatusChange};
pub use publisher::{EventPublisher, InMemoryEventBus, NoOpPublisher};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
