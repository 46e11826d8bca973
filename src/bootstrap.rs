//! One-shot bootstrap signal.
//!
//! The network subsystem fires this exactly once per successful startup, when
//! its initial data sync completes. The signal is single-consumption by
//! construction: the sender is taken on first fire (later fires are dropped
//! with a debug log) and the receiver is taken by the single registered
//! listener — duplicate delivery cannot happen through caller discipline
//! alone, so it is made impossible here.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;
use tracing::debug;

pub struct BootstrapSignal {
    tx: Mutex<Option<oneshot::Sender<()>>>,
    rx: Mutex<Option<oneshot::Receiver<()>>>,
    fired: AtomicBool,
}

impl BootstrapSignal {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            fired: AtomicBool::new(false),
        }
    }

    /// Take the single listener slot. `None` if already taken.
    pub fn subscribe(&self) -> Option<oneshot::Receiver<()>> {
        self.rx.lock().ok()?.take()
    }

    /// Fire the signal. Only the first call delivers; later calls are dropped.
    pub fn fire(&self) {
        let tx = self.tx.lock().ok().and_then(|mut slot| slot.take());
        match tx {
            Some(tx) => {
                self.fired.store(true, Ordering::Release);
                // The listener may already be gone during shutdown; fine.
                let _ = tx.send(());
            }
            None => debug!("duplicate bootstrap fire ignored"),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Default for BootstrapSignal {
    fn default() -> Self {
        Self::new()
    }
}
