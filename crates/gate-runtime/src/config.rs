//! # Gate Configuration
//!
//! Defaults overridden by `AC_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AC_DATA_DIR` | `./data` |
//! | `AC_STORAGE` | `memory` (`file`, `rocksdb`) |
//! | `AC_REFERRAL_BONUS` | `500` |
//! | `AC_CODE_POLICY` | `configured` (`generated`) |
//! | `AC_GENERATED_CODE_LEN` | `8` |
//! | `AC_INITIAL_ACCESS_CODE` | unset |
//! | `AC_BUS_CAPACITY` | `1000` |
//! | `AC_RECONCILE_INTERVAL_SECS` | `60` |
//! | `AC_LOG_LEVEL` / `AC_JSON_LOGS` | `info` / `false` |

use ac_02_disposition::CodePolicy;
use shared_types::Amount;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Shortest code the generated policy may issue.
pub const MIN_GENERATED_CODE_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}: {reason}")]
    Parse {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("referral bonus must be positive")]
    ZeroReferralBonus,

    #[error("generated code length {0} is below the minimum of {MIN_GENERATED_CODE_LEN}")]
    CodeTooShort(usize),

    #[error("initial access code is empty")]
    EmptyInitialCode,

    #[error("event bus capacity must be positive")]
    ZeroBusCapacity,

    #[error("storage backend {0:?} is not compiled in")]
    BackendUnavailable(StorageBackend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(format!("unknown storage backend {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding the store files.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub storage: StorageConfig,
    pub referral_bonus: Amount,
    pub code_policy: CodePolicy,
    /// Seeds the global access code when none is configured yet.
    pub initial_access_code: Option<String>,
    pub bus_capacity: usize,
    pub reconcile_interval: Duration,
    pub log: LogConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            referral_bonus: Amount(500),
            code_policy: CodePolicy::Configured,
            initial_access_code: None,
            bus_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            reconcile_interval: Duration::from_secs(60),
            log: LogConfig::default(),
        }
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl GateConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("AC_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("AC_STORAGE") {
            config.storage.backend = parse("AC_STORAGE", &backend)?;
        }
        if let Some(bonus) = lookup("AC_REFERRAL_BONUS") {
            config.referral_bonus = Amount(parse("AC_REFERRAL_BONUS", &bonus)?);
        }

        let len = match lookup("AC_GENERATED_CODE_LEN") {
            Some(len) => parse("AC_GENERATED_CODE_LEN", &len)?,
            None => 8,
        };
        if let Some(policy) = lookup("AC_CODE_POLICY") {
            config.code_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "configured" => CodePolicy::Configured,
                "generated" => CodePolicy::Generated { len },
                _ => {
                    return Err(ConfigError::Parse {
                        var: "AC_CODE_POLICY",
                        value: policy,
                        reason: "expected configured or generated".into(),
                    })
                }
            };
        }

        config.initial_access_code = lookup("AC_INITIAL_ACCESS_CODE");
        if let Some(capacity) = lookup("AC_BUS_CAPACITY") {
            config.bus_capacity = parse("AC_BUS_CAPACITY", &capacity)?;
        }
        if let Some(secs) = lookup("AC_RECONCILE_INTERVAL_SECS") {
            config.reconcile_interval =
                Duration::from_secs(parse("AC_RECONCILE_INTERVAL_SECS", &secs)?);
        }
        if let Some(level) = lookup("AC_LOG_LEVEL") {
            config.log.level = level;
        }
        if let Some(json) = lookup("AC_JSON_LOGS") {
            config.log.json = parse("AC_JSON_LOGS", &json)?;
        }

        Ok(config)
    }

    /// Rejects values the services would refuse at runtime anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.referral_bonus.is_zero() {
            return Err(ConfigError::ZeroReferralBonus);
        }
        if let CodePolicy::Generated { len } = self.code_policy {
            if len < MIN_GENERATED_CODE_LEN {
                return Err(ConfigError::CodeTooShort(len));
            }
        }
        if let Some(code) = &self.initial_access_code {
            if code.trim().is_empty() {
                return Err(ConfigError::EmptyInitialCode);
            }
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::BackendUnavailable(StorageBackend::RocksDb));
        }
        Ok(())
    }
}
