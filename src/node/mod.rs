//! Node assembly — owns the context, registry and shutdown orchestrator.
//!
//! [`StatsNode`] ties the pieces together: `start` runs the startup
//! sequencer, `run` services signals and the status tick until shutdown
//! completes, and `graceful_shutdown` hands the current registry (if startup
//! got that far) to the orchestrator.

pub mod registry;
pub mod shutdown;
pub mod startup;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::info;

use crate::config::Config;
use crate::context::NodeContext;
use crate::error::AppError;
use crate::node::registry::ServiceRegistry;
use crate::node::shutdown::ShutdownOrchestrator;
use crate::node::startup::StartupSequencer;

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

pub struct StatsNode {
    config: Config,
    ctx: Arc<NodeContext>,
    registry: Mutex<Option<Arc<ServiceRegistry>>>,
    orchestrator: ShutdownOrchestrator,
    started_at: DateTime<Utc>,
}

impl StatsNode {
    pub fn new(config: Config) -> Self {
        let orchestrator =
            ShutdownOrchestrator::new(Duration::from_secs(config.shutdown.deadline_secs));
        Self {
            config,
            ctx: Arc::new(NodeContext::new()),
            registry: Mutex::new(None),
            orchestrator,
            started_at: Utc::now(),
        }
    }

    pub fn context(&self) -> Arc<NodeContext> {
        self.ctx.clone()
    }

    pub fn registry(&self) -> Option<Arc<ServiceRegistry>> {
        match self.registry.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Run the startup sequence. On error nothing is retained — the caller
    /// should fall through to a graceful shutdown (which will take the fast
    /// no-registry path).
    pub fn start(&self) -> Result<(), AppError> {
        let sequencer = StartupSequencer::new(&self.config, self.ctx.clone());
        let registry = sequencer.start()?;
        match self.registry.lock() {
            Ok(mut guard) => *guard = Some(registry),
            Err(poisoned) => *poisoned.into_inner() = Some(registry),
        }
        info!(app_name = %self.config.app_name, "node started");
        Ok(())
    }

    /// Tear the node down; `on_done` fires exactly once, normally or at the
    /// deadline. Safe to call repeatedly.
    pub fn graceful_shutdown<F>(&self, on_done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.orchestrator.graceful_shutdown(self.registry(), on_done);
    }

    /// Service interrupts and the periodic status tick until shutdown
    /// completes.
    pub async fn run(&self) {
        let (done_tx, mut done_rx) = oneshot::channel::<()>();
        let mut done_tx = Some(done_tx);

        let mut tick = tokio::time::interval(STATUS_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received; shutting down");
                    if let Some(tx) = done_tx.take() {
                        self.graceful_shutdown(move || {
                            let _ = tx.send(());
                        });
                    }
                }
                _ = &mut done_rx => break,
                _ = tick.tick() => self.log_status(),
            }
        }
    }

    fn log_status(&self) {
        let uptime_secs = (Utc::now() - self.started_at).num_seconds();
        match read_rss_kb() {
            Some(rss_kb) => info!(uptime_secs, rss_kb, "node status"),
            None => info!(uptime_secs, "node status"),
        }
    }
}

/// Resident-set size from procfs, where available.
fn read_rss_kb() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
        line.split_whitespace().nth(1)?.parse().ok()
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
