//! Shutdown orchestration.
//!
//! One [`ShutdownOrchestrator`] per node drives at most one
//! [`ShutdownSession`]: a reverse-dependency-order teardown raced against a
//! hard deadline. The orchestrator talks to subsystems only through the
//! [`NodeTeardown`] seam, which keeps the sequencing logic testable without
//! real subsystems.
//!
//! # Ordering contract
//!
//! Arbitration stops first (fire-and-forget). Open offers must finish before
//! network shutdown begins. The wallets begin tearing down once network
//! shutdown has been *initiated* — not completed — and the chain is done
//! when the slower of network completion and the wallet-setup
//! shutdown-complete notification has reported in.
//!
//! # Exactly-once completion
//!
//! The caller's completion callback fires exactly once per session,
//! whichever of {chain completion, deadline expiry} happens first. Work
//! still in flight when the deadline wins keeps running — the orchestrator
//! just stops waiting for it.

use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Full teardown budget. Config can override; this is the default.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Delay before completing when startup never built a registry.
pub const NO_REGISTRY_DELAY: Duration = Duration::from_secs(1);

/// Boxed completion future for a single teardown obligation.
pub type TeardownFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The ordered-teardown surface the orchestrator drives.
///
/// Implemented by the service registry in production and by scripted fakes
/// in tests.
pub trait NodeTeardown: Send + Sync + 'static {
    /// Stop arbitration. Fire-and-forget.
    fn stop_arbitration(&self);

    /// Stop open-offer management. Resolves once its resources are released.
    fn stop_open_offers(&self) -> TeardownFuture;

    /// Initiate network-layer shutdown *synchronously within this call*; the
    /// returned future resolves when the network layer has finished.
    fn stop_network(&self) -> TeardownFuture;

    /// Register the wallet-setup shutdown-complete listener. Must be called
    /// before [`NodeTeardown::stop_wallets`] so the notification cannot be
    /// missed.
    fn wallet_shutdown_complete(&self) -> oneshot::Receiver<()>;

    /// Shut down both wallet services and run the auxiliary close hook.
    /// Fire-and-forget; completion arrives via the wallet-setup listener.
    fn stop_wallets(&self) -> Result<(), AppError>;
}

/// Named progress points of the teardown chain, logged per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    TornDownArbitration,
    TornDownOffers,
    NetworkShuttingDown,
    WalletsShuttingDown,
    Done,
}

struct Session {
    id: Uuid,
    done_rx: watch::Receiver<bool>,
}

pub struct ShutdownOrchestrator {
    deadline: Duration,
    session: Mutex<Option<Session>>,
}

impl ShutdownOrchestrator {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            session: Mutex::new(None),
        }
    }

    pub fn session_active(&self) -> bool {
        match self.session.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// Run the teardown. `targets` is `None` when startup never completed —
    /// there is nothing to tear down and the callback fires after a short
    /// delay instead.
    ///
    /// Re-entry while a session is active mutates nothing: the second
    /// caller's callback is completed through the existing session.
    pub fn graceful_shutdown<T, F>(&self, targets: Option<std::sync::Arc<T>>, on_done: F)
    where
        T: NodeTeardown,
        F: FnOnce() + Send + 'static,
    {
        let mut guard = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(session) = guard.as_ref() {
            debug!(session = %session.id, "shutdown already in progress");
            let mut done_rx = session.done_rx.clone();
            tokio::spawn(async move {
                // Resolves when the active session completes. An error here
                // means the driver vanished; complete the caller regardless.
                let _ = done_rx.wait_for(|done| *done).await;
                on_done();
            });
            return;
        }

        let id = Uuid::new_v4();
        let (done_tx, done_rx) = watch::channel(false);
        *guard = Some(Session { id, done_rx });
        drop(guard);

        info!(session = %id, "graceful shutdown requested");
        let deadline = self.deadline;

        match targets {
            None => {
                tokio::spawn(async move {
                    debug!(session = %id, "no registry; nothing to tear down");
                    sleep(NO_REGISTRY_DELAY).await;
                    let _ = done_tx.send(true);
                    on_done();
                });
            }
            Some(targets) => {
                tokio::spawn(async move {
                    // Race between the chain and the deadline. Both branches
                    // are polled from this single task, so exactly one wins;
                    // the loser is dropped. Subsystem work already initiated
                    // keeps running on its own tasks — we only stop waiting.
                    tokio::select! {
                        res = run_chain(targets.as_ref(), id) => match res {
                            Ok(()) => info!(session = %id, "graceful shutdown completed"),
                            Err(e) => {
                                // A broken teardown cannot be retried safely.
                                error!(session = %id, "shutdown initiation failed: {e}");
                                std::process::exit(1);
                            }
                        },
                        _ = sleep(deadline) => {
                            warn!(
                                session = %id,
                                deadline_secs = deadline.as_secs(),
                                "shutdown deadline reached; completing without stragglers"
                            );
                        }
                    }
                    let _ = done_tx.send(true);
                    on_done();
                });
            }
        }
    }
}

impl Default for ShutdownOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

async fn run_chain<T: NodeTeardown>(targets: &T, session: Uuid) -> Result<(), AppError> {
    targets.stop_arbitration();
    debug!(session = %session, phase = ?ShutdownPhase::TornDownArbitration, "phase reached");

    targets.stop_open_offers().await;
    debug!(session = %session, phase = ?ShutdownPhase::TornDownOffers, "phase reached");

    // Initiated here; completion awaited below, concurrently with wallets.
    let network_done = targets.stop_network();
    debug!(session = %session, phase = ?ShutdownPhase::NetworkShuttingDown, "phase reached");

    // Listener first, then initiate, so completion cannot slip past us.
    let wallets_done = targets.wallet_shutdown_complete();
    targets.stop_wallets()?;
    debug!(session = %session, phase = ?ShutdownPhase::WalletsShuttingDown, "phase reached");

    let (_, wallets) = tokio::join!(network_done, wallets_done);
    if wallets.is_err() {
        // Listener dropped without firing; treat as completed rather than hang.
        warn!(session = %session, "wallet-setup listener dropped before completion");
    }
    debug!(session = %session, phase = ?ShutdownPhase::Done, "phase reached");
    Ok(())
}
