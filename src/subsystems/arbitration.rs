//! Arbitration.
//!
//! The arbitrator manager keeps this node's arbitrator registrations fresh on
//! a timer. It is the first subsystem torn down and the only chain member
//! with purely fire-and-forget shutdown: the orchestrator does not wait for
//! it before moving on to open offers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AppError;
use crate::subsystems::{Lifecycle, LifecycleState, Subsystem, Worker};

pub struct ArbitratorManager {
    republish_interval: Duration,
    lifecycle: Arc<Lifecycle>,
    worker: Worker,
}

impl ArbitratorManager {
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
            .spawn("arbitration", run_republish(interval, token));
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
                debug!("arbitrator republish worker shutting down");
                return Ok(());
            }
            _ = tick.tick() => {
                debug!("republishing arbitrator registrations");
            }
        }
    }
}

impl Subsystem for ArbitratorManager {
    fn name(&self) -> &str {
        "arbitration"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::ShuttingDown);
        self.worker.reap("arbitration", self.lifecycle.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fire_and_forget_shutdown_reaches_stopped() {
        let mgr = Arc::new(ArbitratorManager::new(60));
        mgr.start();
        assert_eq!(mgr.state(), LifecycleState::Running);

        mgr.shut_down();
        // Reaper runs on the runtime; give it a turn.
        tokio::time::timeout(Duration::from_secs(1), async {
            while mgr.state() != LifecycleState::Stopped {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
