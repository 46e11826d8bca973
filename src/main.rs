//! statnode — headless trade-statistics node entry point.
//!
//! Startup sequence:
//!   1. Pre-parse the minimal options (app name, data dir)
//!   2. Load .env (if present)
//!   3. Init logger — file sink needs the data dir, so this precedes config
//!   4. Load config, re-apply the configured log level
//!   5. Install the process-wide fault handler
//!   6. Run the startup sequencer, then serve until shutdown
//!
//! Exit codes: 0 on clean shutdown (including a precondition-aborted
//! startup), 1 when startup plumbing or teardown initiation fails.

use tracing::{error, info};

use statnode::config::{self, PreOptions};
use statnode::error::AppError;
use statnode::node::StatsNode;
use statnode::{fault, logger, version};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let pre = PreOptions::parse(std::env::args().skip(1));
    logger::init("info", Some(&pre.data_dir))?;
    info!(
        app_name = %pre.app_name,
        data_dir = %pre.data_dir.display(),
        "logging initialized"
    );

    let config = config::load()?;
    logger::set_level(&config.log_level)?;
    info!("{}", version::banner());

    fault::install();

    let node = StatsNode::new(config);
    if let Err(e) = node.start() {
        // Fatal-but-clean path: abort into a graceful shutdown, exit 0.
        error!("startup aborted: {e}");
        let (tx, rx) = tokio::sync::oneshot::channel();
        node.graceful_shutdown(move || {
            let _ = tx.send(());
        });
        let _ = rx.await;
        info!("shutdown complete");
        return Ok(());
    }

    node.run().await;
    info!("shutdown complete");
    Ok(())
}
