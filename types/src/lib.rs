//! Fundamental types for the token splitter.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! recipient addresses, exact token amounts, chain identifiers, transaction hashes,
//! and the split mode enums.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod mode;
pub mod network;

pub use address::RecipientAddress;
pub use amount::TokenAmount;
pub use error::SplitterError;
pub use hash::TxHash;
pub use mode::{SplitKind, SplitMode};
pub use network::ChainId;

/// Re-exported so downstream crates agree on one primitive version.
pub use alloy_primitives::{Address, U256};
