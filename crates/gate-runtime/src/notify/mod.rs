//! # Notifications
//!
//! Turns bus events into user-facing notifications and hands them to a
//! transport. Delivery failures are counted and logged, never surfaced to
//! the operation that produced the event.

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{DispatchStats, NotificationDispatcher};
pub use transport::{
    LogTransport, Notification, NotificationTransport, RecordingTransport, TransportError,
};
