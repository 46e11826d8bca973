//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `STATNODE_DATA_DIR` and `STATNODE_LOG_LEVEL` env overrides.
//!
//! Full option parsing is out of scope here; the entry point only pre-parses
//! the absolute minimum (app name, data dir) via [`PreOptions`] so logging
//! can be set up before anything else runs.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Minimal options resolved before full config parsing.
///
/// Recognized forms: `--app-name=X` / `--app-name X`, `--data-dir=P` /
/// `--data-dir P`. Anything else is left for the full config layer.
#[derive(Debug, Clone)]
pub struct PreOptions {
    pub app_name: String,
    pub data_dir: PathBuf,
}

impl PreOptions {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut app_name: Option<String> = None;
        let mut data_dir: Option<String> = None;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            if let Some(v) = arg.strip_prefix("--app-name=") {
                app_name = Some(v.to_string());
            } else if arg == "--app-name" {
                app_name = iter.next();
            } else if let Some(v) = arg.strip_prefix("--data-dir=") {
                data_dir = Some(v.to_string());
            } else if arg == "--data-dir" {
                data_dir = iter.next();
            }
        }

        let app_name = app_name
            .or_else(|| env::var("STATNODE_APP_NAME").ok())
            .unwrap_or_else(|| "statnode".to_string());
        let data_dir = data_dir
            .or_else(|| env::var("STATNODE_DATA_DIR").ok())
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| default_data_dir(&app_name));

        Self { app_name, data_dir }
    }
}

fn default_data_dir(app_name: &str) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(format!(".{app_name}")),
        None => PathBuf::from(format!(".{app_name}")),
    }
}

/// Network (p2p) subsystem configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Seed node addresses dialed during initial data sync.
    pub seed_nodes: Vec<String>,
    /// Per-dial connect timeout.
    pub connect_timeout_secs: u64,
    /// Pause between dial rounds while no seed is reachable.
    pub retry_interval_secs: u64,
}

/// Price-feed service configuration.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    /// Base URL of the external price provider.
    pub provider_url: String,
    /// Default market currency code for price lookups.
    pub currency_code: String,
    pub request_timeout_secs: u64,
}

/// Shutdown budget configuration.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Hard wall-clock budget for the whole teardown chain.
    pub deadline_secs: u64,
}

/// Fully-resolved node configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Directory for all persistent data (already expanded, no `~`).
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Base-currency context, set before subsystem construction.
    pub base_currency_code: String,
    pub base_currency_name: String,
    pub network: NetworkConfig,
    pub price: PriceConfig,
    pub shutdown: ShutdownConfig,
    /// Open-offer republish cadence.
    pub offer_republish_interval_secs: u64,
    /// Arbitrator-registration republish cadence.
    pub arbitration_republish_interval_secs: u64,
    /// Wallet sync tick cadence.
    pub wallet_sync_interval_secs: u64,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    node: RawNode,
    #[serde(default)]
    currency: RawCurrency,
    #[serde(default)]
    network: RawNetwork,
    #[serde(default)]
    price: RawPrice,
    #[serde(default)]
    shutdown: RawShutdown,
    #[serde(default)]
    offers: RawOffers,
    #[serde(default)]
    arbitration: RawArbitration,
    #[serde(default)]
    wallet: RawWallet,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default = "default_app_name")]
    app_name: String,
    data_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawCurrency {
    #[serde(default = "default_base_code")]
    base_code: String,
    #[serde(default = "default_base_name")]
    base_name: String,
}

impl Default for RawCurrency {
    fn default() -> Self {
        Self {
            base_code: default_base_code(),
            base_name: default_base_name(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawNetwork {
    #[serde(default)]
    seed_nodes: Vec<String>,
    #[serde(default = "default_connect_timeout")]
    connect_timeout_secs: u64,
    #[serde(default = "default_retry_interval")]
    retry_interval_secs: u64,
}

#[derive(Deserialize)]
struct RawPrice {
    #[serde(default = "default_provider_url")]
    provider_url: String,
    #[serde(default = "default_price_currency")]
    currency_code: String,
    #[serde(default = "default_price_timeout")]
    request_timeout_secs: u64,
}

impl Default for RawPrice {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            currency_code: default_price_currency(),
            request_timeout_secs: default_price_timeout(),
        }
    }
}

#[derive(Deserialize)]
struct RawShutdown {
    #[serde(default = "default_deadline")]
    deadline_secs: u64,
}

impl Default for RawShutdown {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline(),
        }
    }
}

#[derive(Deserialize)]
struct RawOffers {
    #[serde(default = "default_offer_republish")]
    republish_interval_secs: u64,
}

impl Default for RawOffers {
    fn default() -> Self {
        Self {
            republish_interval_secs: default_offer_republish(),
        }
    }
}

#[derive(Deserialize)]
struct RawArbitration {
    #[serde(default = "default_arbitration_republish")]
    republish_interval_secs: u64,
}

impl Default for RawArbitration {
    fn default() -> Self {
        Self {
            republish_interval_secs: default_arbitration_republish(),
        }
    }
}

#[derive(Deserialize)]
struct RawWallet {
    #[serde(default = "default_wallet_sync")]
    sync_interval_secs: u64,
}

impl Default for RawWallet {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_wallet_sync(),
        }
    }
}

fn default_app_name() -> String { "statnode".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_base_code() -> String { "BTC".to_string() }
fn default_base_name() -> String { "Bitcoin".to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_retry_interval() -> u64 { 5 }
fn default_provider_url() -> String { "https://price.statnode.example".to_string() }
fn default_price_currency() -> String { "USD".to_string() }
fn default_price_timeout() -> u64 { 10 }
fn default_deadline() -> u64 { 5 }
fn default_offer_republish() -> u64 { 30 }
fn default_arbitration_republish() -> u64 { 60 }
fn default_wallet_sync() -> u64 { 30 }

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let data_dir_override = env::var("STATNODE_DATA_DIR").ok();
    let log_level_override = env::var("STATNODE_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        data_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    data_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let n = parsed.node;
    let data_dir_str = data_dir_override.unwrap_or(&n.data_dir).to_string();
    let data_dir = expand_home(&data_dir_str);
    let log_level = log_level_override.unwrap_or(&n.log_level).to_string();

    Ok(Config {
        app_name: n.app_name,
        data_dir,
        log_level,
        base_currency_code: parsed.currency.base_code,
        base_currency_name: parsed.currency.base_name,
        network: NetworkConfig {
            seed_nodes: parsed.network.seed_nodes,
            connect_timeout_secs: parsed.network.connect_timeout_secs,
            retry_interval_secs: parsed.network.retry_interval_secs,
        },
        price: PriceConfig {
            provider_url: parsed.price.provider_url,
            currency_code: parsed.price.currency_code,
            request_timeout_secs: parsed.price.request_timeout_secs,
        },
        shutdown: ShutdownConfig {
            deadline_secs: parsed.shutdown.deadline_secs,
        },
        offer_republish_interval_secs: parsed.offers.republish_interval_secs,
        arbitration_republish_interval_secs: parsed.arbitration.republish_interval_secs,
        wallet_sync_interval_secs: parsed.wallet.sync_interval_secs,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Safe `Config` for tests — no reachable seeds, no real price provider,
    /// short shutdown budget handled by paused-time tests.
    pub fn test_default(data_dir: &Path) -> Self {
        Self {
            app_name: "statnode-test".into(),
            data_dir: data_dir.to_path_buf(),
            log_level: "info".into(),
            base_currency_code: "BTC".into(),
            base_currency_name: "Bitcoin".into(),
            network: NetworkConfig {
                seed_nodes: Vec::new(),
                connect_timeout_secs: 1,
                retry_interval_secs: 1,
            },
            price: PriceConfig {
                provider_url: "http://127.0.0.1:0".into(),
                currency_code: "USD".into(),
                request_timeout_secs: 1,
            },
            shutdown: ShutdownConfig { deadline_secs: 5 },
            offer_republish_interval_secs: 30,
            arbitration_republish_interval_secs: 60,
            wallet_sync_interval_secs: 30,
        }
    }
}
