//! Ports (hexagonal architecture).

pub mod inbound;
pub mod outbound;

pub use inbound::DispositionApi;
pub use outbound::{ReferralCreditPort, ReferralCreditResult};
