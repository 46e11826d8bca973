//! Protocol and storage version constants, logged once at startup.

pub const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const P2P_NETWORK_VERSION: u32 = 1;
pub const LOCAL_DB_VERSION: u32 = 1;
pub const TRADE_PROTOCOL_VERSION: u32 = 1;

/// One-line startup banner.
pub fn banner() -> String {
    format!(
        "statnode version{{VERSION={NODE_VERSION}, P2P_NETWORK_VERSION={P2P_NETWORK_VERSION}, \
         LOCAL_DB_VERSION={LOCAL_DB_VERSION}, TRADE_PROTOCOL_VERSION={TRADE_PROTOCOL_VERSION}}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_mentions_all_versions() {
        let b = banner();
        assert!(b.contains(NODE_VERSION));
        assert!(b.contains("P2P_NETWORK_VERSION"));
        assert!(b.contains("TRADE_PROTOCOL_VERSION"));
    }
}
