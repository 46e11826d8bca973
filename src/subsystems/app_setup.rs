//! Top-level application setup.
//!
//! The last step of the startup sequence: starts every constructed subsystem
//! in dependency order, the network layer strictly last, so the capability
//! set is already established and every consumer exists before the node
//! advertises presence.

use std::sync::Arc;

use tracing::info;

use crate::subsystems::arbitration::ArbitratorManager;
use crate::subsystems::network::P2pService;
use crate::subsystems::offers::{OfferBookService, OpenOfferManager};
use crate::subsystems::pricefeed::PriceFeedService;
use crate::subsystems::wallet::{WalletService, WalletsSetup};
use crate::subsystems::{Lifecycle, LifecycleState, Subsystem};

pub struct AppSetup {
    lifecycle: Arc<Lifecycle>,
    wallets_setup: Arc<WalletsSetup>,
    base_wallet: Arc<WalletService>,
    token_wallet: Arc<WalletService>,
    offer_book: Arc<OfferBookService>,
    open_offers: Arc<OpenOfferManager>,
    arbitration: Arc<ArbitratorManager>,
    price_feed: Arc<PriceFeedService>,
    p2p: Arc<P2pService>,
}

impl AppSetup {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wallets_setup: Arc<WalletsSetup>,
        base_wallet: Arc<WalletService>,
        token_wallet: Arc<WalletService>,
        offer_book: Arc<OfferBookService>,
        open_offers: Arc<OpenOfferManager>,
        arbitration: Arc<ArbitratorManager>,
        price_feed: Arc<PriceFeedService>,
        p2p: Arc<P2pService>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            wallets_setup,
            base_wallet,
            token_wallet,
            offer_book,
            open_offers,
            arbitration,
            price_feed,
            p2p,
        }
    }

    /// Start all subsystems. Network last.
    pub fn start(&self) {
        if !self.lifecycle.advance(LifecycleState::Starting) {
            return;
        }
        self.wallets_setup.start();
        self.base_wallet.start();
        self.token_wallet.start();
        self.offer_book.start();
        self.open_offers.start();
        self.arbitration.start();
        self.price_feed.start();
        self.p2p.start();
        self.lifecycle.advance(LifecycleState::Running);
        info!("app setup complete; all subsystems started");
    }
}

impl Subsystem for AppSetup {
    fn name(&self) -> &str {
        "app-setup"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Members are torn down individually by the shutdown orchestrator.
    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::Stopped);
    }
}
