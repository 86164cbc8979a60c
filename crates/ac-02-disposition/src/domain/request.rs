use serde::{Deserialize, Serialize};
use shared_types::{DispositionAction, OperatorId, RecordId};

/// An operator decision on one purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionRequest {
    pub record_id: RecordId,
    pub action: DispositionAction,
    /// Asserted by the identity provider; privilege is checked upstream.
    pub operator: OperatorId,
    /// Code to issue instead of the policy's code. Approve only.
    pub code_override: Option<String>,
    pub note: Option<String>,
}

impl DispositionRequest {
    pub fn new(record_id: RecordId, action: DispositionAction, operator: OperatorId) -> Self {
        Self {
            record_id,
            action,
            operator,
            code_override: None,
            note: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code_override = Some(code.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The override with surrounding whitespace removed, if non-empty.
    pub fn code_override(&self) -> Option<&str> {
        self.code_override
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
