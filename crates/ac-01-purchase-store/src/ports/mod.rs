//! Ports (hexagonal architecture).

pub mod inbound;
pub mod outbound;

pub use inbound::PurchaseStoreApi;
pub use outbound::{BatchOperation, KeyValueStore};
