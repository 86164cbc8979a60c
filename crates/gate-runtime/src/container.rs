//! # Gate Container
//!
//! Builds every subsystem once and shares it behind `Arc`s.
//!
//! ```text
//! AnyKVStore ─→ PurchaseStore ─┬─→ ReferralCreditTrigger ─→ ReferralCreditAdapter ─┐
//!                              ├─→ WithdrawalGate                                    │
//!                              └─→ DispositionEngine ←───────────────────────────────┘
//!                                        │
//!                                        └─→ InMemoryEventBus
//! ```

use crate::adapters::{AnyKVStore, ReferralCreditAdapter};
use crate::config::{GateConfig, StorageBackend, StorageConfig};
use ac_01_purchase_store::{FileBackedKVStore, InMemoryKVStore, PurchaseStore};
use ac_02_disposition::{DispositionApi, DispositionEngine};
use ac_03_referral_credit::{ReferralConfig, ReferralCreditTrigger};
use ac_04_withdrawal_gate::WithdrawalGate;
use anyhow::{Context, Result};
use shared_bus::InMemoryEventBus;
use shared_types::{AccessCodeSetting, BalanceLedger, OperatorId, SystemTimeSource, TimeSource};
use std::sync::Arc;
use tracing::info;

/// Operator recorded on a code seeded from configuration.
pub const BOOTSTRAP_OPERATOR: &str = "bootstrap";

const STORE_FILE: &str = "purchases.db";

pub struct GateContainer {
    pub config: GateConfig,
    pub store: Arc<PurchaseStore<AnyKVStore>>,
    pub bus: Arc<InMemoryEventBus>,
    pub ledger: Arc<dyn BalanceLedger>,
    pub referrals: Arc<ReferralCreditTrigger<AnyKVStore>>,
    pub engine: Arc<DispositionEngine<AnyKVStore>>,
    pub withdrawals: Arc<WithdrawalGate<AnyKVStore>>,
}

fn open_store(config: &StorageConfig) -> Result<AnyKVStore> {
    match config.backend {
        StorageBackend::Memory => Ok(AnyKVStore::Memory(InMemoryKVStore::new())),
        StorageBackend::File => {
            let path = config.data_dir.join(STORE_FILE);
            let store = FileBackedKVStore::open(&path)
                .with_context(|| format!("opening store at {}", path.display()))?;
            Ok(AnyKVStore::File(store))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => {
            let path = config.data_dir.join("rocksdb");
            let store = crate::adapters::RocksDbStore::open_default(&path)
                .with_context(|| format!("opening RocksDB at {}", path.display()))?;
            Ok(AnyKVStore::RocksDb(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => {
            anyhow::bail!("storage backend rocksdb requires the `rocksdb` feature")
        }
    }
}

impl GateContainer {
    /// Wires the subsystems with the system clock.
    pub fn build(config: GateConfig, ledger: Arc<dyn BalanceLedger>) -> Result<Self> {
        Self::build_with_time(config, ledger, Arc::new(SystemTimeSource))
    }

    pub fn build_with_time(
        config: GateConfig,
        ledger: Arc<dyn BalanceLedger>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let kv = open_store(&config.storage)?;
        info!(backend = kv.backend_name(), "Purchase store opened");

        let store = Arc::new(PurchaseStore::new(kv, time));
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        let referrals = Arc::new(ReferralCreditTrigger::new(
            store.clone(),
            ledger.clone(),
            ReferralConfig {
                bonus: config.referral_bonus,
                ..ReferralConfig::default()
            },
        ));
        let engine = Arc::new(DispositionEngine::new(
            store.clone(),
            Arc::new(ReferralCreditAdapter::new(referrals.clone())),
            bus.clone(),
            config.code_policy,
        ));
        let withdrawals = Arc::new(WithdrawalGate::new(store.clone(), ledger.clone()));

        info!(
            policy = ?config.code_policy,
            referral_bonus = %config.referral_bonus,
            "Subsystems wired"
        );

        Ok(Self {
            config,
            store,
            bus,
            ledger,
            referrals,
            engine,
            withdrawals,
        })
    }

    /// Writes `initial_access_code` if no global code exists yet.
    pub async fn seed_access_code(&self) -> Result<Option<AccessCodeSetting>> {
        let Some(code) = &self.config.initial_access_code else {
            return Ok(None);
        };
        if self.store.global_code()?.is_some() {
            return Ok(None);
        }
        let setting = self
            .engine
            .set_global_code(code, &OperatorId::new(BOOTSTRAP_OPERATOR))
            .await
            .context("seeding the global access code")?;
        info!(version = setting.version, "Global access code seeded");
        Ok(Some(setting))
    }
}
