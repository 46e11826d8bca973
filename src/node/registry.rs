//! Service registry — constructs and owns every subsystem.
//!
//! The orchestrator references subsystems through this registry but does not
//! manage their memory; after construction the registry is a shared
//! read-only lookup. [`ServiceRegistry::close`] is the auxiliary close hook
//! run alongside wallet teardown (scoped resources with no subsystem of
//! their own).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;
use crate::node::shutdown::{NodeTeardown, TeardownFuture};
use crate::subsystems::Subsystem;
use crate::subsystems::app_setup::AppSetup;
use crate::subsystems::arbitration::ArbitratorManager;
use crate::subsystems::network::P2pService;
use crate::subsystems::offers::{OfferBookService, OpenOfferManager};
use crate::subsystems::pricefeed::PriceFeedService;
use crate::subsystems::stats::TradeStatisticsManager;
use crate::subsystems::wallet::{WalletRole, WalletService, WalletsSetup};

pub struct ServiceRegistry {
    pub p2p: Arc<P2pService>,
    pub offer_book: Arc<OfferBookService>,
    pub open_offers: Arc<OpenOfferManager>,
    pub arbitration: Arc<ArbitratorManager>,
    pub wallets_setup: Arc<WalletsSetup>,
    pub base_wallet: Arc<WalletService>,
    pub token_wallet: Arc<WalletService>,
    pub price_feed: Arc<PriceFeedService>,
    pub trade_stats: Arc<TradeStatisticsManager>,
    pub app_setup: Arc<AppSetup>,
    closed: AtomicBool,
}

impl ServiceRegistry {
    /// Construct all subsystems. Nothing starts here; `AppSetup::start`
    /// brings them up in dependency order.
    pub fn build(config: &Config) -> Result<Self, AppError> {
        let p2p = Arc::new(P2pService::new(config.network.clone()));
        let offer_book = Arc::new(OfferBookService::new());
        let open_offers = Arc::new(OpenOfferManager::new(config.offer_republish_interval_secs));
        let arbitration = Arc::new(ArbitratorManager::new(
            config.arbitration_republish_interval_secs,
        ));
        let wallets_setup = Arc::new(WalletsSetup::new(config.wallet_sync_interval_secs));
        let base_wallet = Arc::new(WalletService::new(WalletRole::Base));
        let token_wallet = Arc::new(WalletService::new(WalletRole::Token));
        let price_feed = Arc::new(PriceFeedService::new(&config.price)?);
        let trade_stats = Arc::new(TradeStatisticsManager::new());

        let app_setup = Arc::new(AppSetup::new(
            wallets_setup.clone(),
            base_wallet.clone(),
            token_wallet.clone(),
            offer_book.clone(),
            open_offers.clone(),
            arbitration.clone(),
            price_feed.clone(),
            p2p.clone(),
        ));

        Ok(Self {
            p2p,
            offer_book,
            open_offers,
            arbitration,
            wallets_setup,
            base_wallet,
            token_wallet,
            price_feed,
            trade_stats,
            app_setup,
            closed: AtomicBool::new(false),
        })
    }

    /// Every subsystem, for status reporting.
    pub fn subsystems(&self) -> Vec<&dyn Subsystem> {
        vec![
            self.app_setup.as_ref(),
            self.p2p.as_ref(),
            self.offer_book.as_ref(),
            self.open_offers.as_ref(),
            self.arbitration.as_ref(),
            self.wallets_setup.as_ref(),
            self.base_wallet.as_ref(),
            self.token_wallet.as_ref(),
            self.price_feed.as_ref(),
            self.trade_stats.as_ref(),
        ]
    }

    /// Close registry-scoped resources. Idempotent.
    pub fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(
            observed_offers = self.offer_book.observed_offers(),
            recorded_trades = self.trade_stats.recorded_trades(),
            "registry resources closed"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl NodeTeardown for ServiceRegistry {
    fn stop_arbitration(&self) {
        self.arbitration.shut_down();
    }

    fn stop_open_offers(&self) -> TeardownFuture {
        let open_offers = self.open_offers.clone();
        Box::pin(async move { open_offers.shut_down_and_wait().await })
    }

    fn stop_network(&self) -> TeardownFuture {
        // Initiation must happen inside this call, before the future is
        // polled — the wallets are allowed to start tearing down now.
        self.p2p.initiate_shutdown();
        let p2p = self.p2p.clone();
        Box::pin(async move { p2p.shut_down_and_wait().await })
    }

    fn wallet_shutdown_complete(&self) -> oneshot::Receiver<()> {
        self.wallets_setup.on_shutdown_complete()
    }

    fn stop_wallets(&self) -> Result<(), AppError> {
        self.wallets_setup.shut_down();
        self.base_wallet.shut_down();
        self.token_wallet.shut_down();
        self.close()
    }
}
