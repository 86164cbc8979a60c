//! # Test Fixtures
//!
//! A fully wired world, built through the same container the runtime uses,
//! with a controllable clock and ledger. In-memory by default; `on_disk`
//! runs on the file-backed store.

use ac_01_purchase_store::PurchaseStoreApi;
use ac_02_disposition::{CodePolicy, DispositionApi, DispositionRequest};
use gate_runtime::adapters::AnyKVStore;
use gate_runtime::{GateConfig, GateContainer, StorageBackend};
use shared_types::{
    DispositionAction, GateResult, InMemoryLedger, MockTimeSource, OperatorId, ProofRef,
    PurchaseRecord, PurchaseStatus, RecordId, UserId,
};
use std::path::Path;
use std::sync::Arc;

pub type Store = ac_01_purchase_store::PurchaseStore<AnyKVStore>;

pub const T0: u64 = 1_700_000_000_000;

pub struct World {
    pub gate: GateContainer,
    pub ledger: Arc<InMemoryLedger>,
    pub time: Arc<MockTimeSource>,
}

pub fn op() -> OperatorId {
    OperatorId::new("op1")
}

pub fn user(n: u32) -> UserId {
    UserId::new(format!("u{}", n))
}

impl World {
    pub fn new() -> Self {
        Self::with_policy(CodePolicy::Configured)
    }

    pub fn with_policy(policy: CodePolicy) -> Self {
        Self::with_ledger(policy, InMemoryLedger::new())
    }

    pub fn with_ledger(policy: CodePolicy, ledger: InMemoryLedger) -> Self {
        let config = GateConfig {
            code_policy: policy,
            ..GateConfig::default()
        };
        Self::with_config(config, Arc::new(ledger))
    }

    /// A world on the file-backed store in `dir`; reopening the same
    /// directory sees everything an earlier world committed.
    pub fn on_disk(dir: &Path, ledger: Arc<InMemoryLedger>) -> Self {
        let mut config = GateConfig::default();
        config.storage.backend = StorageBackend::File;
        config.storage.data_dir = dir.to_path_buf();
        Self::with_config(config, ledger)
    }

    fn with_config(config: GateConfig, ledger: Arc<InMemoryLedger>) -> Self {
        let time = Arc::new(MockTimeSource::new(T0));
        let gate = match GateContainer::build_with_time(config, ledger.clone(), time.clone()) {
            Ok(gate) => gate,
            Err(e) => panic!("test configuration must build: {e:#}"),
        };
        Self { gate, ledger, time }
    }

    pub fn store(&self) -> &Store {
        &self.gate.store
    }

    pub async fn submit(&self, user_id: &UserId) -> GateResult<PurchaseRecord> {
        self.time.advance(1);
        self.gate
            .engine
            .submit(user_id, ProofRef::new(format!("img://{}", user_id)))
            .await
    }

    pub async fn decide(
        &self,
        id: RecordId,
        action: DispositionAction,
        code: Option<&str>,
    ) -> GateResult<PurchaseRecord> {
        self.time.advance(1);
        let mut request = DispositionRequest::new(id, action, op());
        if let Some(code) = code {
            request = request.with_code(code);
        }
        self.gate.engine.disposition(request).await
    }

    pub async fn approve(&self, id: RecordId, code: &str) -> GateResult<PurchaseRecord> {
        self.decide(id, DispositionAction::Approve, Some(code)).await
    }

    pub async fn reject(&self, id: RecordId) -> GateResult<PurchaseRecord> {
        self.decide(id, DispositionAction::Reject, None).await
    }

    pub async fn revoke(&self, id: RecordId) -> GateResult<PurchaseRecord> {
        self.decide(id, DispositionAction::Revoke, None).await
    }

    /// Checks every cross-table invariant for `user_id`.
    pub fn assert_invariants(&self, user_id: &UserId) {
        let history = self.store().history_for_user(user_id).unwrap();
        for record in &history {
            assert!(record.is_consistent(), "inconsistent record {:?}", record);
            assert_eq!(
                record.issued_code().is_some(),
                record.status() == PurchaseStatus::Approved,
                "code/status mismatch on {}",
                record.id()
            );
        }

        let pending = history
            .iter()
            .filter(|r| r.status() == PurchaseStatus::Pending)
            .count();
        assert!(pending <= 1, "{} has {} pending records", user_id, pending);

        let gate = self.store().gate_state(user_id).unwrap();
        assert!(gate.is_consistent(), "inconsistent gate {:?}", gate);
        assert_eq!(gate.has_purchased(), gate.access_code().is_some());
        let any_approved = history
            .iter()
            .any(|r| r.status() == PurchaseStatus::Approved);
        assert_eq!(
            gate.has_purchased(),
            any_approved,
            "gate of {} disagrees with its approved records",
            user_id
        );
        if let Some(source) = gate.source_record() {
            let record = self.store().get(source).unwrap();
            assert_eq!(record.status(), PurchaseStatus::Approved);
            assert_eq!(record.issued_code(), gate.access_code());
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
