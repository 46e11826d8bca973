//! Price-feed service.
//!
//! Fetches market prices from the external price provider over HTTPS. Used
//! once the network bootstrap completes — market-based offers need a price
//! reference. Request failures are the caller's to log; they are never fatal
//! to node lifecycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::PriceConfig;
use crate::error::AppError;
use crate::subsystems::{Lifecycle, LifecycleState, Subsystem};

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(rename = "currencyCode")]
    currency_code: String,
    price: f64,
}

pub struct PriceFeedService {
    client: reqwest::Client,
    provider_url: String,
    currency_code: Mutex<String>,
    lifecycle: Arc<Lifecycle>,
}

impl PriceFeedService {
    pub fn new(config: &PriceConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::PriceFeed(format!("http client: {e}")))?;
        Ok(Self {
            client,
            provider_url: config.provider_url.trim_end_matches('/').to_string(),
            currency_code: Mutex::new(config.currency_code.clone()),
            lifecycle: Lifecycle::new(),
        })
    }

    pub fn start(&self) {
        self.lifecycle.advance(LifecycleState::Running);
    }

    /// Set the market currency used for price lookups.
    pub fn set_currency_code(&self, code: &str) {
        let mut slot = match self.currency_code.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        debug!(currency = code, "price feed currency set");
        *slot = code.to_string();
    }

    pub fn currency_code(&self) -> String {
        match self.currency_code.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Request the current market price for the configured currency.
    pub async fn request_price_feed(&self) -> Result<f64, AppError> {
        let code = self.currency_code();
        let url = format!("{}/prices/{code}", self.provider_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::PriceFeed(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::PriceFeed(format!("provider rejected request: {e}")))?;

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| AppError::PriceFeed(format!("bad provider response: {e}")))?;

        if body.currency_code != code {
            return Err(AppError::PriceFeed(format!(
                "provider answered for {} instead of {code}",
                body.currency_code
            )));
        }
        Ok(body.price)
    }
}

impl Subsystem for PriceFeedService {
    fn name(&self) -> &str {
        "price-feed"
    }

    fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn shut_down(&self) {
        self.lifecycle.advance(LifecycleState::Stopped);
    }
}
