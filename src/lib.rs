//! statnode — startup/shutdown orchestration for a headless
//! trade-statistics network node.
//!
//! The node is a set of independently-lifecycled subsystems (p2p client,
//! wallets, offer management, arbitration, price feed, statistics manager).
//! This crate's core is the sequencing around them: dependency-ordered
//! bring-up driven by [`node::startup::StartupSequencer`], reaction to the
//! one-shot [`bootstrap::BootstrapSignal`], and the deadline-bounded
//! reverse-order teardown in [`node::shutdown::ShutdownOrchestrator`].

pub mod bootstrap;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fault;
pub mod logger;
pub mod node;
pub mod subsystems;
pub mod version;
