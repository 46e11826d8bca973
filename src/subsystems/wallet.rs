//! Wallet subsystems.
//!
//! [`WalletsSetup`] owns the shared wallet kit (block-storage engine, chain
//! sync) and is the subsystem whose "shutdown complete" notification gates
//! the end of the teardown chain: listeners registered through
//! [`WalletsSetup::on_shutdown_complete`] are notified exactly once, after
//! the kit has fully released its resources.
//!
//! The two [`WalletService`] instances (base-currency and token) ride on top
//! of the kit. They shut down fire-and-forget, concurrently with each other,
//! and only after network-layer shutdown has been initiated — ordering the
//! shutdown orchestrator enforces.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AppError;
use crate::subsystems::{Lifecycle, LifecycleState, Subsystem, Worker};

// ── WalletsSetup ─────────────────────────────────────────────────────────────

pub struct WalletsSetup {
    sync_interval: Duration,
    lifecycle: Arc<Lifecycle>,
    worker: Worker,
    completed: Arc<AtomicBool>,
    listeners: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    teardown_started: AtomicBool,
}

impl WalletsSetup {
    pub fn new(sync_interval_secs: u64) -> Self {
        Self {
            sync_interval: Duration::from_secs(sync_interval_secs),
            lifecycle: Lifecycle::new(),
            worker: Worker::idle(),
            completed: Arc::new(AtomicBool::new(false)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            teardown_started: AtomicBool::new(false),
        }
    }

    pub fn start(self: &Arc<Self>) {
        if !self.lifecycle.advance(LifecycleState::Starting) {
            return;
        }
        let interval = self.sync_interval;
        let token = self.worker.token();
        self.lifecycle.advance(LifecycleState::Running);
        self.worker.spawn("wallets-setup", run_kit(interval, token));
    }

    /// Register a shutdown-complete listener. Fires exactly once; a listener
    /// registered after completion is notified immediately.
    pub fn on_shutdown_complete(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.completed.load(Ordering::Acquire) {
            let _ = tx.send(());
            return rx;
        }
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    pub fn shutdown_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    fn notify_complete(
        completed: &AtomicBool,
        listeners: &Mutex<Vec<oneshot::Sender<()>>>,
    ) {
        completed.store(true, Ordering::Release);
        let drained = match listeners.lock() {
            Ok(mut listeners) => std::mem::take(&mut *listeners),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for tx in drained {
            let _ = tx.send(());
        }
    }
}

async fn run_kit(interval: Duration, shutdown: CancellationToken) -> Result<(), AppError> {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("wallet kit shutting down");
                return Ok(());
            }
            _ = tick.tick() => {
                debug!("wallet kit chain sync tick");
            }
        }
    }
}

impl Subsystem for WalletsSetup {
    fn name(&self) -> &str {
        "wallets-setup"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Initiate kit teardown. Completion is observable through
    /// [`WalletsSetup::on_shutdown_complete`], never awaited here.
    fn shut_down(&self) {
        // First initiation wins; later calls must not re-notify early.
        if self.teardown_started.swap(true, Ordering::AcqRel) {
            debug!("wallets-setup teardown already initiated");
            return;
        }
        self.lifecycle.advance(LifecycleState::ShuttingDown);
        self.worker.cancel();

        let handle = self.worker.take_handle();
        let lifecycle = self.lifecycle.clone();
        let completed = self.completed.clone();
        let listeners = self.listeners.clone();
        tokio::spawn(async move {
            if let Some(handle) = handle {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => crate::fault::handle_task_fault("wallets-setup", &e),
                    Err(e) => {
                        tracing::error!(subsystem = "wallets-setup", "worker panicked: {e}")
                    }
                }
            }
            lifecycle.advance(LifecycleState::Stopped);
            Self::notify_complete(&completed, &listeners);
            debug!("wallets-setup shutdown complete");
        });
    }
}

// ── WalletService ────────────────────────────────────────────────────────────

/// Which wallet a [`WalletService`] instance manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletRole {
    /// Base-currency wallet.
    Base,
    /// Token (colored-coin) wallet.
    Token,
}

impl WalletRole {
    fn name(self) -> &'static str {
        match self {
            WalletRole::Base => "base-wallet",
            WalletRole::Token => "token-wallet",
        }
    }
}

pub struct WalletService {
    role: WalletRole,
    lifecycle: Arc<Lifecycle>,
    worker: Worker,
}

impl WalletService {
    pub fn new(role: WalletRole) -> Self {
        Self {
            role,
            lifecycle: Lifecycle::new(),
            worker: Worker::idle(),
        }
    }

    pub fn role(&self) -> WalletRole {
        self.role
    }

    pub fn start(self: &Arc<Self>) {
        if !self.lifecycle.advance(LifecycleState::Starting) {
            return;
        }
        let token = self.worker.token();
        self.lifecycle.advance(LifecycleState::Running);
        self.worker.spawn(self.role.name(), async move {
            // Wallet bookkeeping idles until the kit tells it to stop.
            token.cancelled().await;
            Ok(())
        });
    }
}

impl Subsystem for WalletService {
    fn name(&self) -> &str {
        self.role.name()
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::ShuttingDown);
        self.worker.reap(self.role.name(), self.lifecycle.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_before_shutdown_fires_once() {
        let setup = Arc::new(WalletsSetup::new(30));
        setup.start();
        let rx = setup.on_shutdown_complete();
        setup.shut_down();
        rx.await.unwrap();
        assert!(setup.shutdown_complete());
        assert_eq!(setup.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn listener_after_completion_fires_immediately() {
        let setup = Arc::new(WalletsSetup::new(30));
        setup.start();
        let first = setup.on_shutdown_complete();
        setup.shut_down();
        first.await.unwrap();

        let late = setup.on_shutdown_complete();
        late.await.unwrap();
    }

    #[tokio::test]
    async fn double_shutdown_notifies_once_per_listener() {
        let setup = Arc::new(WalletsSetup::new(30));
        setup.start();
        let rx = setup.on_shutdown_complete();
        setup.shut_down();
        setup.shut_down(); // second initiation finds no worker; harmless
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn wallet_services_stop_concurrently() {
        let base = Arc::new(WalletService::new(WalletRole::Base));
        let token = Arc::new(WalletService::new(WalletRole::Token));
        base.start();
        token.start();

        base.shut_down();
        token.shut_down();

        tokio::time::timeout(Duration::from_secs(1), async {
            while base.state() != LifecycleState::Stopped
                || token.state() != LifecycleState::Stopped
            {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
