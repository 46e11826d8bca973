//! Shutdown orchestrator properties, driven through a scripted fake
//! teardown with paused tokio time.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use statnode::error::AppError;
use statnode::node::shutdown::{NodeTeardown, ShutdownOrchestrator, TeardownFuture};

const DEADLINE: Duration = Duration::from_secs(5);

/// How long each stage takes to report completion. `None` means the stage
/// never signals (the obligation is held open forever).
struct Script {
    offers_delay: Option<Duration>,
    network_delay: Duration,
    wallets_delay: Option<Duration>,
}

struct FakeTeardown {
    script: Script,
    arbitration_calls: AtomicUsize,
    offers_calls: AtomicUsize,
    network_calls: AtomicUsize,
    wallets_calls: AtomicUsize,
    // Held senders keep "never fires" obligations pending instead of closed.
    held: Mutex<Vec<oneshot::Sender<()>>>,
}

impl FakeTeardown {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            arbitration_calls: AtomicUsize::new(0),
            offers_calls: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
            wallets_calls: AtomicUsize::new(0),
            held: Mutex::new(Vec::new()),
        })
    }
}

impl NodeTeardown for FakeTeardown {
    fn stop_arbitration(&self) {
        self.arbitration_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_open_offers(&self) -> TeardownFuture {
        self.offers_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.offers_delay {
            Some(delay) => Box::pin(tokio::time::sleep(delay)),
            None => Box::pin(std::future::pending::<()>()),
        }
    }

    fn stop_network(&self) -> TeardownFuture {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(tokio::time::sleep(self.script.network_delay))
    }

    fn wallet_shutdown_complete(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        match self.script.wallets_delay {
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(());
                });
            }
            None => self.held.lock().unwrap().push(tx),
        }
        rx
    }

    fn stop_wallets(&self) -> Result<(), AppError> {
        self.wallets_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn shutdown_and_track(
    orchestrator: &ShutdownOrchestrator,
    targets: Option<Arc<FakeTeardown>>,
    done_count: Arc<AtomicUsize>,
) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    orchestrator.graceful_shutdown(targets, move || {
        done_count.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(());
    });
    rx
}

#[tokio::test(start_paused = true)]
async fn ordered_completion_fires_once_before_deadline() {
    // Offers finish at 0.5s; network takes 1s from initiation; the
    // wallet-setup listener fires 2s after registration. Completion tracks
    // the slowest obligation (~2.5s), not the 5s deadline.
    let fake = FakeTeardown::new(Script {
        offers_delay: Some(Duration::from_millis(500)),
        network_delay: Duration::from_secs(1),
        wallets_delay: Some(Duration::from_secs(2)),
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let rx = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    rx.await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(2500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2700), "elapsed {elapsed:?}");
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(fake.arbitration_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.offers_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.network_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.wallets_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn completion_tracks_slowest_of_network_and_wallets() {
    // Same chain with the race inverted: network is the straggler.
    let fake = FakeTeardown::new(Script {
        offers_delay: Some(Duration::from_millis(100)),
        network_delay: Duration::from_secs(3),
        wallets_delay: Some(Duration::from_millis(200)),
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let rx = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    rx.await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(3100), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3300), "elapsed {elapsed:?}");
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stuck_subsystem_hits_deadline_and_later_stages_never_run() {
    // Open offers never signal: completion fires at the deadline and the
    // network/wallet stages are never invoked.
    let fake = FakeTeardown::new(Script {
        offers_delay: None,
        network_delay: Duration::from_secs(1),
        wallets_delay: Some(Duration::from_secs(1)),
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let rx = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    rx.await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= DEADLINE, "elapsed {elapsed:?}");
    assert!(elapsed < DEADLINE + Duration::from_millis(200), "elapsed {elapsed:?}");
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(fake.offers_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.network_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fake.wallets_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn wallets_never_signal_deadline_still_bounds_completion() {
    let fake = FakeTeardown::new(Script {
        offers_delay: Some(Duration::from_millis(100)),
        network_delay: Duration::from_millis(100),
        wallets_delay: None,
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let rx = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    rx.await.unwrap();

    assert!(start.elapsed() >= DEADLINE);
    assert_eq!(done.load(Ordering::SeqCst), 1);
    // The chain got as far as initiating wallet teardown exactly once.
    assert_eq!(fake.wallets_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn reentry_does_not_create_second_session() {
    let fake = FakeTeardown::new(Script {
        offers_delay: Some(Duration::from_millis(500)),
        network_delay: Duration::from_millis(500),
        wallets_delay: Some(Duration::from_millis(500)),
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let first = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    assert!(orchestrator.session_active());
    // Second call while the session is active: no new session, no second
    // round of subsystem shutdowns; the caller still gets completion.
    let second = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());

    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 2);
    assert_eq!(fake.arbitration_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.offers_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.network_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.wallets_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn no_registry_completes_after_short_delay() {
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let rx = shutdown_and_track(&orchestrator, None, done.clone());
    rx.await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "elapsed {elapsed:?}");
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn instant_completions_still_fire_once() {
    // Everything reports done immediately: degenerate ordering, one callback.
    let fake = FakeTeardown::new(Script {
        offers_delay: Some(Duration::ZERO),
        network_delay: Duration::ZERO,
        wallets_delay: Some(Duration::ZERO),
    });
    let orchestrator = ShutdownOrchestrator::new(DEADLINE);
    let done = Arc::new(AtomicUsize::new(0));

    let rx = shutdown_and_track(&orchestrator, Some(fake.clone()), done.clone());
    rx.await.unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(fake.arbitration_calls.load(Ordering::SeqCst), 1);
}
