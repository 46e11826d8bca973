//! Startup sequencing.
//!
//! [`StartupSequencer::start`] runs the strict bring-up order:
//!
//! 1. crypto runtime precondition self-test
//! 2. base-currency context (before any subsystem construction reads it)
//! 3. subsystem construction via the service registry
//! 4. default price-feed currency code
//! 5. one-shot bootstrap listener registration
//! 6. process-wide capability set establishment
//! 7. `AppSetup::start` (network last, so presence is advertised only after
//!    the capability set exists)
//!
//! A failed precondition aborts startup with an error; the caller turns that
//! into a graceful shutdown rather than a crash.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capabilities::CapabilitySet;
use crate::config::Config;
use crate::context::{BaseCurrency, NodeContext};
use crate::crypto;
use crate::error::AppError;
use crate::node::registry::ServiceRegistry;

pub struct StartupSequencer<'a> {
    config: &'a Config,
    ctx: Arc<NodeContext>,
}

impl<'a> StartupSequencer<'a> {
    pub fn new(config: &'a Config, ctx: Arc<NodeContext>) -> Self {
        Self { config, ctx }
    }

    /// Bring the node up. Returns the built registry on success.
    pub fn start(&self) -> Result<Arc<ServiceRegistry>, AppError> {
        crypto::check_crypto_setup()?;

        self.ctx.set_base_currency(BaseCurrency {
            code: self.config.base_currency_code.clone(),
            name: self.config.base_currency_name.clone(),
        })?;
        info!(
            base_currency = %self.config.base_currency_code,
            "base currency context set"
        );

        let registry = Arc::new(ServiceRegistry::build(self.config)?);

        registry
            .price_feed
            .set_currency_code(&self.config.price.currency_code);

        self.register_bootstrap_listener(&registry)?;

        let capabilities = CapabilitySet::statistics_node();
        info!(capabilities = %capabilities, "capability set established");
        self.ctx.set_capabilities(capabilities)?;

        registry.app_setup.start();
        Ok(registry)
    }

    /// Wire the one-shot bootstrap listener: on first (and only) fire,
    /// request external price data and tell the statistics manager that all
    /// services are initialized. A price-feed failure is logged, never fatal.
    fn register_bootstrap_listener(
        &self,
        registry: &Arc<ServiceRegistry>,
    ) -> Result<(), AppError> {
        let signal = registry.p2p.subscribe_bootstrap().ok_or_else(|| {
            AppError::Subsystem {
                subsystem: "p2p".into(),
                message: "bootstrap listener already registered".into(),
            }
        })?;

        let price_feed = registry.price_feed.clone();
        let trade_stats = registry.trade_stats.clone();
        tokio::spawn(async move {
            if signal.await.is_err() {
                debug!("bootstrap signal dropped before firing");
                return;
            }
            info!("bootstrap complete; requesting price feed");
            // Two dependent actions, no ordering between them.
            trade_stats.on_all_services_initialized();
            match price_feed.request_price_feed().await {
                Ok(price) => info!(
                    price,
                    currency = %price_feed.currency_code(),
                    "price feed received"
                ),
                Err(e) => warn!("price feed request failed: {e}"),
            }
        });
        Ok(())
    }
}
