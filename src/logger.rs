//! Logging setup — stdout plus a log file under the data directory.
//!
//! Initialized from the minimal pre-parsed options *before* config parsing,
//! so every subsystem (config loading included) can log. Once the config is
//! loaded the level is re-applied through a reloadable filter. `RUST_LOG`
//! always wins over the configured level.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::error::AppError;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

/// Install the global subscriber. `log_dir` gets a `statnode.log` file sink;
/// `None` logs to stdout only (tests, early failures).
pub fn init(level: &str, log_dir: Option<&Path>) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logger(format!("bad log level {level:?}: {e}")))?;

    let (filter_layer, handle) = reload::Layer::new(filter);
    let base = tracing_subscriber::registry().with(filter_layer);

    let init_result = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = File::create(dir.join("statnode.log"))?;
            base.with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .try_init()
        }
        None => base.with(fmt::layer()).try_init(),
    };
    init_result.map_err(|e| AppError::Logger(format!("subscriber install failed: {e}")))?;

    let _ = FILTER.set(handle);
    Ok(())
}

/// Re-apply the filter at the configured level. No-op when `RUST_LOG` is set.
pub fn set_level(level: &str) -> Result<(), AppError> {
    if std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    let handle = FILTER
        .get()
        .ok_or_else(|| AppError::Logger("logger not initialized".into()))?;
    let filter = EnvFilter::try_new(level)
        .map_err(|e| AppError::Logger(format!("bad log level {level:?}: {e}")))?;
    handle
        .reload(filter)
        .map_err(|e| AppError::Logger(format!("filter reload failed: {e}")))
}
