//! Provider traits for the chain collaborators.
//!
//! The splitter never talks to a node directly; everything goes through these
//! traits so the same logic runs against [`crate::EthRpcClient`] or against
//! in-memory doubles.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use splitter_types::{ChainId, TxHash};

use crate::error::ChainError;

/// Connected account and network.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain id of the connected network.
    async fn chain_id(&self) -> Result<ChainId, ChainError>;

    /// Accounts the provider can sign for, preferred account first.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;
}

/// ENS forward and reverse lookups.
#[async_trait]
pub trait EnsResolver: Send + Sync {
    /// Resolve a name to an address. `Ok(None)` when the name has no resolver or no address.
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ChainError>;

    /// Primary name of an address, if one is set and resolves back to the address.
    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ChainError>;
}

/// Read-only ERC20 calls.
#[async_trait]
pub trait TokenReader: Send + Sync {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn metadata(&self, token: Address) -> Result<TokenMetadata, ChainError>;
}

/// Transaction submission. Signing is the provider's business.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, ChainError>;

    /// `Some(true)` once mined successfully, `Some(false)` if reverted, `None` while pending.
    async fn receipt_status(&self, hash: TxHash) -> Result<Option<bool>, ChainError>;
}

/// Everything the splitter needs from a chain.
pub trait ChainAccess: WalletProvider + EnsResolver + TokenReader + TransactionSender {}

impl<T> ChainAccess for T where T: WalletProvider + EnsResolver + TokenReader + TransactionSender {}

/// ERC20 display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// A contract call to be signed and sent by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    /// Native currency attached to the call.
    pub value: U256,
}

impl TxRequest {
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}
