//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("crypto precondition failed: {0}")]
    Crypto(String),

    #[error("capability error: {0}")]
    Capability(String),

    #[error("price feed error: {0}")]
    PriceFeed(String),

    #[error("shutdown error: {0}")]
    Shutdown(String),

    #[error("subsystem {subsystem}: {message}")]
    Subsystem { subsystem: String, message: String },

    /// A fault with its cause preserved, so handlers can walk the chain.
    #[error("{context}")]
    Faulted {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Wrap `source` while keeping it reachable via [`std::error::Error::source`].
    pub fn faulted(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Faulted {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Known-recoverable fault raised by the block-storage engine underneath the
/// wallet services. The process-wide fault handler treats these specially.
#[derive(Debug, Error)]
#[error("block storage fault: {0}")]
pub struct StorageFault(pub String);
