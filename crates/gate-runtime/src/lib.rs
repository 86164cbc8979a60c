//! # Gate Runtime Library
//!
//! Exposes the runtime's modules for the binary and for tests.
//!
//! - `config/` - `GateConfig` from `AC_*` environment variables
//! - `telemetry` - tracing subscriber setup
//! - `container` - subsystem wiring
//! - `adapters/` - storage backends, referral port bridge
//! - `notify/` - notification transport and dispatcher
//! - `runtime` - background tasks and shutdown

pub mod adapters;
pub mod config;
pub mod container;
pub mod notify;
pub mod runtime;
pub mod telemetry;

pub use config::{ConfigError, GateConfig, StorageBackend};
pub use container::GateContainer;
pub use runtime::GateRuntime;
