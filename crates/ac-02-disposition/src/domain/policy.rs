//! # Code Issuance Policy
//!
//! Chosen by the caller at wiring time:
//!
//! - `Configured`: the current global `AccessCodeSetting`, stamped with its
//!   version. Approval fails if no code has been configured.
//! - `Generated { len }`: a fresh uppercase alphanumeric code per approval.
//!
//! A per-request override always wins over the policy.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodePolicy {
    #[default]
    Configured,
    Generated { len: usize },
}

/// Random code of `len` characters from `CODE_ALPHABET`.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
