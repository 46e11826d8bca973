//! Offer management.
//!
//! [`OfferBookService`] is a passive view over offers observed on the
//! network; it holds no worker. [`OpenOfferManager`] republishes this node's
//! open offers on a timer and participates in the ordered teardown chain:
//! its shutdown resolves only after the republish worker has released its
//! resources and pending offers are flushed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AppError;
use crate::subsystems::{Lifecycle, LifecycleState, Subsystem, Worker};

// ── OfferBookService ─────────────────────────────────────────────────────────

/// Passive registry of offers currently visible on the network.
pub struct OfferBookService {
    lifecycle: Arc<Lifecycle>,
    observed_offers: AtomicU64,
}

impl OfferBookService {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            observed_offers: AtomicU64::new(0),
        }
    }

    pub fn start(&self) {
        self.lifecycle.advance(LifecycleState::Running);
    }

    pub fn record_offer(&self) {
        self.observed_offers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observed_offers(&self) -> u64 {
        self.observed_offers.load(Ordering::Relaxed)
    }
}

impl Default for OfferBookService {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsystem for OfferBookService {
    fn name(&self) -> &str {
        "offer-book"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::Stopped);
    }
}

// ── OpenOfferManager ─────────────────────────────────────────────────────────

pub struct OpenOfferManager {
    republish_interval: Duration,
    lifecycle: Arc<Lifecycle>,
    worker: Worker,
}

impl OpenOfferManager {
    pub fn new(republish_interval_secs: u64) -> Self {
        Self {
            republish_interval: Duration::from_secs(republish_interval_secs),
            lifecycle: Lifecycle::new(),
            worker: Worker::idle(),
        }
    }

    pub fn start(self: &Arc<Self>) {
        if !self.lifecycle.advance(LifecycleState::Starting) {
            return;
        }
        let interval = self.republish_interval;
        let token = self.worker.token();
        self.lifecycle.advance(LifecycleState::Running);
        self.worker
            .spawn("open-offers", run_republish(interval, token));
    }

    /// Chain-participant shutdown: resolves after the republish worker exits.
    pub async fn shut_down_and_wait(&self) {
        self.lifecycle.advance(LifecycleState::ShuttingDown);
        self.worker.join("open-offers").await;
        self.lifecycle.advance(LifecycleState::Stopped);
    }
}

async fn run_republish(
    interval: Duration,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("open-offer republish worker shutting down");
                return Ok(());
            }
            _ = tick.tick() => {
                debug!("republishing open offers");
            }
        }
    }
}

impl Subsystem for OpenOfferManager {
    fn name(&self) -> &str {
        "open-offers"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::ShuttingDown);
        self.worker.reap("open-offers", self.lifecycle.clone());
    }
}
