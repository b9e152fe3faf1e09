//! Chain access for the token splitter.
//!
//! Provides:
//! - Provider traits for the read path (ENS, ERC20 reads) and the write path
//!   (transaction submission), so callers can swap in test doubles
//! - ABI bindings for ERC20, the splitter contract and ENS
//! - ENS name normalisation and namehash
//! - [`EthRpcClient`], a JSON-RPC 2.0 client over HTTP implementing every trait

pub mod abi;
pub mod client;
pub mod ens;
pub mod error;
pub mod provider;

pub use client::{EthRpcClient, RpcClientConfig};
pub use error::ChainError;
pub use provider::{
    ChainAccess, EnsResolver, TokenMetadata, TokenReader, TransactionSender, TxRequest,
    WalletProvider,
};
