//! Subsystem scaffolding shared by every managed service.
//!
//! # Lifecycle model
//!
//! Each subsystem advances through `Uninitialized → Starting → Running →
//! ShuttingDown → Stopped`, strictly forward: [`Lifecycle::advance`] ignores
//! any attempt to move backwards, so no subsystem re-enters an earlier state.
//!
//! # Worker model
//!
//! A subsystem that does background work owns exactly one [`Worker`]: a
//! spawned task plus its [`CancellationToken`]. Shutdown is cooperative —
//! cancel the token, then either await the task ([`Worker::join`], chain
//! participants) or let a reaper collect it ([`Worker::reap`],
//! fire-and-forget participants). Worker errors are routed into the
//! process-wide fault handler and never terminate the process.

pub mod app_setup;
pub mod arbitration;
pub mod network;
pub mod offers;
pub mod pricefeed;
pub mod stats;
pub mod wallet;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::capabilities::Capability;
use crate::error::AppError;
use crate::fault;

// ── LifecycleState ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Starting = 1,
    Running = 2,
    ShuttingDown = 3,
    Stopped = 4,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Monotonic lifecycle cell. Shared between a subsystem and its reaper task.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Advance to `next`. Returns `false` (and leaves the state untouched)
    /// when `next` is not strictly ahead of the current state.
    pub fn advance(&self, next: LifecycleState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if next as u8 <= current {
                debug!(
                    current = ?LifecycleState::from_u8(current),
                    requested = ?next,
                    "ignoring non-forward lifecycle transition"
                );
                return false;
            }
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

// ── Subsystem ────────────────────────────────────────────────────────────────

/// Uniform handle every managed subsystem implements.
///
/// `shut_down` is fire-and-forget. Subsystems participating in the ordered
/// teardown chain additionally expose an inherent async completion path
/// (`shut_down_and_wait`), awaited by the shutdown orchestrator.
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    /// Capability flags this subsystem contributes to the node's advertised set.
    fn capabilities(&self) -> &[Capability] {
        &[]
    }

    fn state(&self) -> LifecycleState;

    /// Begin teardown without waiting for completion.
    fn shut_down(&self);
}

// ── Worker ───────────────────────────────────────────────────────────────────

/// One background task plus its cancellation token.
pub struct Worker {
    handle: Mutex<Option<JoinHandle<Result<(), AppError>>>>,
    token: CancellationToken,
}

impl Worker {
    pub fn idle() -> Self {
        Self {
            handle: Mutex::new(None),
            token: CancellationToken::new(),
        }
    }

    /// Token the worker future should `select!` on for cooperative shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn the worker future. A second spawn is ignored — one worker per
    /// subsystem, and lifecycle transitions are monotonic anyway.
    pub fn spawn<F>(&self, name: &str, fut: F)
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let mut slot = match self.handle.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            debug!(subsystem = name, "worker already spawned");
            return;
        }
        debug!(subsystem = name, "spawning worker");
        *slot = Some(tokio::spawn(fut));
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Detach the worker's join handle. `None` when the worker never started
    /// or another collector already owns it.
    pub fn take_handle(&self) -> Option<JoinHandle<Result<(), AppError>>> {
        match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Cancel and await the worker. Errors go to the fault handler; a missing
    /// worker (never started, or already collected) returns immediately.
    pub async fn join(&self, name: &str) {
        self.cancel();
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else { return };
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => fault::handle_task_fault(name, &e),
            Err(e) => error!(subsystem = name, "worker panicked: {e}"),
        }
    }

    /// Cancel and collect the worker on a detached reaper task, advancing
    /// `lifecycle` to `Stopped` once it is gone. Fire-and-forget teardown.
    pub fn reap(&self, name: &'static str, lifecycle: Arc<Lifecycle>) {
        self.cancel();
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        tokio::spawn(async move {
            if let Some(handle) = handle {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => fault::handle_task_fault(name, &e),
                    Err(e) => error!(subsystem = name, "worker panicked: {e}"),
                }
            }
            lifecycle.advance(LifecycleState::Stopped);
            debug!(subsystem = name, "stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), LifecycleState::Uninitialized);

        assert!(lc.advance(LifecycleState::Starting));
        assert!(lc.advance(LifecycleState::Running));
        // Backwards and same-state transitions are ignored.
        assert!(!lc.advance(LifecycleState::Starting));
        assert!(!lc.advance(LifecycleState::Running));
        assert_eq!(lc.state(), LifecycleState::Running);

        assert!(lc.advance(LifecycleState::ShuttingDown));
        assert!(lc.advance(LifecycleState::Stopped));
        assert!(!lc.advance(LifecycleState::Running));
        assert_eq!(lc.state(), LifecycleState::Stopped);
    }

    #[test]
    fn lifecycle_can_skip_states() {
        // A passive subsystem may go straight from Running to Stopped.
        let lc = Lifecycle::new();
        assert!(lc.advance(LifecycleState::Running));
        assert!(lc.advance(LifecycleState::Stopped));
    }

    #[tokio::test]
    async fn worker_join_collects_task() {
        let worker = Worker::idle();
        let token = worker.token();
        worker.spawn("test", async move {
            token.cancelled().await;
            Ok(())
        });
        worker.join("test").await;
        // Second join is a no-op.
        worker.join("test").await;
    }

    #[tokio::test]
    async fn worker_second_spawn_ignored() {
        let worker = Worker::idle();
        worker.spawn("test", async { Ok(()) });
        worker.spawn("test", async { panic!("must never run") });
        worker.join("test").await;
    }
}
