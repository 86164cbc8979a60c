//! Per-user gate state derived from the latest approved purchase.
//!
//! `(access_code, has_purchased)` is written as one unit; the pair can never
//! be observed half-updated because it only changes by replacing the whole
//! value.

use crate::entities::{RecordId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGateState {
    user_id: UserId,
    access_code: Option<String>,
    has_purchased: bool,
    /// The approved record the current code came from.
    source_record: Option<RecordId>,
    version: u64,
    updated_at: Timestamp,
}

impl UserGateState {
    /// Gate state of a user who never held a code.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            access_code: None,
            has_purchased: false,
            source_record: None,
            version: 0,
            updated_at: 0,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn access_code(&self) -> Option<&str> {
        self.access_code.as_deref()
    }

    pub fn has_purchased(&self) -> bool {
        self.has_purchased
    }

    pub fn source_record(&self) -> Option<RecordId> {
        self.source_record
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// `has_purchased == access_code.is_some()`, and a code always has a source.
    pub fn is_consistent(&self) -> bool {
        self.has_purchased == self.access_code.is_some()
            && self.access_code.is_some() == self.source_record.is_some()
    }

    /// True when `record` is the record currently backing the code.
    pub fn is_sourced_from(&self, record: RecordId) -> bool {
        self.source_record == Some(record)
    }

    /// New state holding `code` issued by `source`.
    pub fn granted(&self, code: impl Into<String>, source: RecordId, now: Timestamp) -> Self {
        Self {
            user_id: self.user_id.clone(),
            access_code: Some(code.into()),
            has_purchased: true,
            source_record: Some(source),
            version: self.version + 1,
            updated_at: now,
        }
    }

    /// New state with the code cleared.
    pub fn cleared(&self, now: Timestamp) -> Self {
        Self {
            user_id: self.user_id.clone(),
            access_code: None,
            has_purchased: false,
            source_record: None,
            version: self.version + 1,
            updated_at: now,
        }
    }
}
