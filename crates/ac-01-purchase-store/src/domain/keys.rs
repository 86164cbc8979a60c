//! # Key Layout
//!
//! | Prefix | Key suffix | Value |
//! |--------|------------|-------|
//! | `p:` | record id | `PurchaseRecord` |
//! | `o:` | user | id of the user's open (`Pending`) record |
//! | `u:` | user, created_at, record id | record id (history index) |
//! | `s:` | status, created_at, record id | record id (queue index) |
//! | `g:` | user | `UserGateState` |
//! | `r:` | referred user | `ReferralLink` |
//! | `c:` | referred user | `PendingCredit` |
//! | `m:` | name | settings |
//!
//! User ids are length-prefixed so that one user's keys can never be a
//! prefix of another's (`u1` vs `u10`). Timestamps are big-endian so a
//! prefix scan sorted by key is sorted by creation time.

use shared_types::{PurchaseStatus, RecordId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    Record,
    OpenRecord,
    UserHistory,
    StatusQueue,
    Gate,
    Referral,
    PendingCredit,
    Metadata,
}

impl KeyPrefix {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Record => b"p:",
            KeyPrefix::OpenRecord => b"o:",
            KeyPrefix::UserHistory => b"u:",
            KeyPrefix::StatusQueue => b"s:",
            KeyPrefix::Gate => b"g:",
            KeyPrefix::Referral => b"r:",
            KeyPrefix::PendingCredit => b"c:",
            KeyPrefix::Metadata => b"m:",
        }
    }

    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    fn user_key(&self, user: &UserId) -> Vec<u8> {
        let bytes = user.as_str().as_bytes();
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        key.extend_from_slice(bytes);
        key
    }

    pub fn record_key(id: RecordId) -> Vec<u8> {
        KeyPrefix::Record.key(id.as_bytes())
    }

    pub fn open_key(user: &UserId) -> Vec<u8> {
        KeyPrefix::OpenRecord.user_key(user)
    }

    /// Prefix covering every history entry of `user`.
    pub fn history_prefix(user: &UserId) -> Vec<u8> {
        KeyPrefix::UserHistory.user_key(user)
    }

    pub fn history_key(user: &UserId, created_at: Timestamp, id: RecordId) -> Vec<u8> {
        let mut key = Self::history_prefix(user);
        key.extend_from_slice(&created_at.to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Prefix covering every queue entry in `status`.
    pub fn status_prefix(status: PurchaseStatus) -> Vec<u8> {
        KeyPrefix::StatusQueue.key(&[status_tag(status)])
    }

    pub fn status_key(status: PurchaseStatus, created_at: Timestamp, id: RecordId) -> Vec<u8> {
        let mut key = Self::status_prefix(status);
        key.extend_from_slice(&created_at.to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    pub fn gate_key(user: &UserId) -> Vec<u8> {
        KeyPrefix::Gate.user_key(user)
    }

    pub fn referral_key(new_user: &UserId) -> Vec<u8> {
        KeyPrefix::Referral.user_key(new_user)
    }

    pub fn pending_credit_key(new_user: &UserId) -> Vec<u8> {
        KeyPrefix::PendingCredit.user_key(new_user)
    }

    pub fn access_code_key() -> Vec<u8> {
        KeyPrefix::Metadata.key(b"access_code")
    }
}

fn status_tag(status: PurchaseStatus) -> u8 {
    match status {
        PurchaseStatus::Pending => 0,
        PurchaseStatus::Approved => 1,
        PurchaseStatus::Rejected => 2,
        PurchaseStatus::Cancelled => 3,
    }
}
