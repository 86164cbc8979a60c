//! # Gate Runtime
//!
//! Owns the container and the two background tasks.
//!
//! ## Startup Sequence
//!
//! 1. Seed the global access code (if configured and absent)
//! 2. Spawn the notification dispatcher
//! 3. Spawn the referral reconciliation loop
//!
//! Shutdown flips one watch channel; both tasks exit on it.

use crate::adapters::AnyKVStore;
use crate::container::GateContainer;
use crate::notify::{DispatchStats, NotificationDispatcher, NotificationTransport};
use ac_03_referral_credit::{ReconcileReport, ReferralCreditApi, ReferralCreditTrigger};
use anyhow::Result;
use parking_lot::Mutex;
use shared_bus::EventFilter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct GateRuntime {
    container: Arc<GateContainer>,
    transport: Arc<dyn NotificationTransport>,
    dispatch_stats: Mutex<Option<Arc<DispatchStats>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// One reconciliation pass; failures are logged and the loop carries on.
fn reconcile_once(referrals: &ReferralCreditTrigger<AnyKVStore>) -> Option<ReconcileReport> {
    referrals
        .reconcile()
        .map_err(|e| error!(error = %e, "Referral reconciliation failed"))
        .ok()
}

impl GateRuntime {
    pub fn new(container: GateContainer, transport: Arc<dyn NotificationTransport>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            transport,
            dispatch_stats: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn container(&self) -> &Arc<GateContainer> {
        &self.container
    }

    /// Delivery counters of the running dispatcher.
    pub fn dispatch_stats(&self) -> Option<Arc<DispatchStats>> {
        self.dispatch_stats.lock().clone()
    }

    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Access-Gate Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.container.seed_access_code().await?;

        let dispatcher = NotificationDispatcher::new(self.transport.clone());
        *self.dispatch_stats.lock() = Some(dispatcher.stats());
        let dispatch = dispatcher.spawn(
            self.container.bus.subscribe(EventFilter::all()),
            self.shutdown_rx.clone(),
        );

        let reconcile = self.spawn_reconciler(self.container.config.reconcile_interval);

        self.tasks.lock().extend([dispatch, reconcile]);
        info!("Runtime started");
        Ok(())
    }

    fn spawn_reconciler(&self, interval: Duration) -> JoinHandle<()> {
        let referrals = self.container.referrals.clone();
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        reconcile_once(&referrals);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Reconciliation loop stopped");
        })
    }

    /// Signals shutdown and waits for the background tasks.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Shutdown complete");
    }
}
