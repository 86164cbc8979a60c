//! # AC-02 Disposition Engine
//!
//! Sole authority for moving a purchase record out of `Pending` or
//! `Approved`, and the only writer of issued access codes.
//!
//! ## State machine
//!
//! ```text
//! Pending  --approve--> Approved
//! Pending  --reject-->  Rejected
//! Pending  --cancel-->  Cancelled   (user or operator)
//! Approved --revoke-->  Cancelled   (operator)
//! ```
//!
//! The table itself lives in `shared_types::lifecycle`; this crate only
//! consults it through the `PurchaseRecord` transition methods.
//!
//! ## Side effects, in order
//!
//! 1. record + gate state (one atomic commit)
//! 2. referral credit (approve only, best-effort)
//! 3. status event (fire-and-forget)

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{generate_code, CodePolicy, DispositionRequest};
pub use ports::outbound::NoReferrals;
pub use ports::{DispositionApi, ReferralCreditPort, ReferralCreditResult};
pub use service::DispositionEngine;
