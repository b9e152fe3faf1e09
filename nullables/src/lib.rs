//! Nullable infrastructure for deterministic testing.
//!
//! All chain collaborators (wallet provider, ENS, ERC20 reads, transaction
//! sending) are abstracted behind the `splitter-rpc` traits. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (scripted balances, failures, delays)
//! - Record every transaction instead of sending it
//! - Never touch the network
//!
//! Usage: swap `EthRpcClient` for [`NullChain`] in tests.

pub mod chain;
pub mod resolver;

pub use chain::{NullChain, SentTransaction};
pub use resolver::NullResolver;
