//! JSON-RPC client for an Ethereum node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use splitter_types::{ChainId, TxHash};

use crate::abi::{IEnsRegistry, IEnsResolver, IERC20};
use crate::ens;
use crate::error::ChainError;
use crate::provider::{
    EnsResolver, TokenMetadata, TokenReader, TransactionSender, TxRequest, WalletProvider,
};

/// HTTP settings for [`EthRpcClient`].
#[derive(Clone, Debug)]
pub struct RpcClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// ENS registry to resolve names against.
    pub ens_registry: Address,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ens_registry: ens::ENS_REGISTRY,
        }
    }
}

/// HTTP client for communicating with an Ethereum node via JSON-RPC 2.0.
///
/// Wraps `reqwest::Client` with the node's URL and provides typed methods
/// for every call the splitter needs. Signing is left to the node
/// (`eth_sendTransaction`), which holds or proxies the account's keys.
pub struct EthRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    ens_registry: Address,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ReceiptResult {
    #[serde(default)]
    status: Option<String>,
}

impl EthRpcClient {
    /// Create a client targeting the given URL (e.g. `http://127.0.0.1:8545`).
    pub fn new(rpc_url: impl Into<String>, config: RpcClientConfig) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            ens_registry: config.ens_registry,
            next_id: AtomicU64::new(1),
        })
    }

    /// The node URL requests go to.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Send a JSON-RPC request and decode the `result` member.
    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "json-rpc request");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("invalid JSON response: {e}")))?;

        if let Some(err) = envelope.error {
            tracing::debug!(method, id, code = err.code, "json-rpc error: {}", err.message);
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| ChainError::Decode(format!("invalid {method} result: {e}")))
    }

    /// `eth_call` against the latest block.
    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, ChainError> {
        let data = Bytes::from(data);
        self.rpc_call(
            "eth_call",
            serde_json::json!([{ "to": to, "data": data }, "latest"]),
        )
        .await
    }

    /// Call a view function and decode its return value.
    async fn call_view<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, ChainError> {
        let output = self.eth_call(to, call.abi_encode()).await?;
        C::abi_decode_returns(&output, true)
            .map_err(|e| ChainError::Decode(format!("{} returned {output}: {e}", C::SIGNATURE)))
    }

    /// Resolver contract registered for `node`, if any.
    async fn resolver_of(&self, node: B256) -> Result<Option<Address>, ChainError> {
        let resolver = self
            .call_view(self.ens_registry, IEnsRegistry::resolverCall { node })
            .await?
            ._0;
        Ok((!resolver.is_zero()).then_some(resolver))
    }
}

fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("invalid quantity {raw:?}: {e}")))
}

#[async_trait]
impl WalletProvider for EthRpcClient {
    async fn chain_id(&self) -> Result<ChainId, ChainError> {
        let raw: String = self.rpc_call("eth_chainId", serde_json::json!([])).await?;
        parse_quantity(&raw).map(ChainId::new)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.rpc_call("eth_accounts", serde_json::json!([])).await
    }
}

#[async_trait]
impl EnsResolver for EthRpcClient {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ChainError> {
        let normalized = ens::normalize(name)?;
        let node = ens::namehash(&normalized);

        let Some(resolver) = self.resolver_of(node).await? else {
            tracing::debug!(name = %normalized, "no resolver set");
            return Ok(None);
        };

        let resolved = self
            .call_view(resolver, IEnsResolver::addrCall { node })
            .await?
            ._0;
        Ok((!resolved.is_zero()).then_some(resolved))
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ChainError> {
        let node = ens::namehash(&ens::reverse_name(address));

        let Some(resolver) = self.resolver_of(node).await? else {
            return Ok(None);
        };

        let name = self
            .call_view(resolver, IEnsResolver::nameCall { node })
            .await?
            ._0;
        if name.is_empty() {
            return Ok(None);
        }

        // A reverse record is only trusted if the name resolves back to the address.
        match self.resolve_name(&name).await? {
            Some(forward) if forward == address => Ok(Some(name)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl TokenReader for EthRpcClient {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self
            .call_view(token, IERC20::allowanceCall { owner, spender })
            .await?
            ._0)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self
            .call_view(token, IERC20::balanceOfCall { owner })
            .await?
            ._0)
    }

    async fn metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        let symbol = self.call_view(token, IERC20::symbolCall {}).await?._0;
        let name = self.call_view(token, IERC20::nameCall {}).await?._0;
        let decimals = self.call_view(token, IERC20::decimalsCall {}).await?._0;
        Ok(TokenMetadata {
            symbol,
            name,
            decimals,
        })
    }
}

#[async_trait]
impl TransactionSender for EthRpcClient {
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, ChainError> {
        let mut tx = serde_json::json!({
            "from": request.from,
            "to": request.to,
            "data": request.data,
        });
        if !request.value.is_zero() {
            tx["value"] = serde_json::json!(request.value);
        }

        let hash: TxHash = self
            .rpc_call("eth_sendTransaction", serde_json::json!([tx]))
            .await?;
        tracing::info!(%hash, to = %request.to, "transaction sent");
        Ok(hash)
    }

    async fn receipt_status(&self, hash: TxHash) -> Result<Option<bool>, ChainError> {
        let receipt: Option<ReceiptResult> = self
            .rpc_call("eth_getTransactionReceipt", serde_json::json!([hash]))
            .await?;
        match receipt {
            None => Ok(None),
            Some(ReceiptResult { status: None }) => Ok(None),
            Some(ReceiptResult {
                status: Some(status),
            }) => Ok(Some(parse_quantity(&status)? == 1)),
        }
    }
}
