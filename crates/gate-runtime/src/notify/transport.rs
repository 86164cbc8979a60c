//! Notification payload and transports.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{RecordId, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

/// A message for one user's devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    /// What the client opens when the notification is tapped.
    pub cta_ref: Option<String>,
    pub record_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError>;
}

/// Writes each notification to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| TransportError::Encoding(e.to_string()))?;
        info!(user_id = %notification.user_id, payload = %payload, "notification");
        Ok(())
    }
}

/// Keeps delivered notifications in memory; can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, user_id: &UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("recording transport offline".into()));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}
