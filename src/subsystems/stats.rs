//! Trade-statistics manager.
//!
//! Passive until the bootstrap listener reports that all services are
//! initialized; from then on it accepts trade-statistics entries observed on
//! the network. The statistics computation itself lives elsewhere — this
//! subsystem only tracks readiness and counts what it has seen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{debug, info};

use crate::subsystems::{Lifecycle, LifecycleState, Subsystem};

pub struct TradeStatisticsManager {
    lifecycle: Arc<Lifecycle>,
    initialized: AtomicBool,
    recorded: AtomicU64,
}

impl TradeStatisticsManager {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            initialized: AtomicBool::new(false),
            recorded: AtomicU64::new(0),
        }
    }

    /// Called once from the bootstrap listener after initial data sync.
    pub fn on_all_services_initialized(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            debug!("trade statistics already initialized");
            return;
        }
        self.lifecycle.advance(LifecycleState::Running);
        info!("all services initialized; trade statistics active");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Record one observed trade-statistics entry. Entries seen before
    /// initialization are dropped.
    pub fn record_trade(&self) {
        if self.is_initialized() {
            self.recorded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn recorded_trades(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

impl Default for TradeStatisticsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsystem for TradeStatisticsManager {
    fn name(&self) -> &str {
        "trade-statistics"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::Stopped);
    }
}
