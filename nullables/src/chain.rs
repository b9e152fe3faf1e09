//! Nullable chain: scripted reads, recorded writes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy_primitives::{keccak256, Address, U256};
use async_trait::async_trait;
use splitter_rpc::abi::{decode_approve, SplitCall};
use splitter_rpc::{
    ChainError, EnsResolver, TokenMetadata, TokenReader, TransactionSender, TxRequest,
    WalletProvider,
};
use splitter_types::{ChainId, TxHash};

use crate::resolver::NullResolver;

/// A transaction the chain "received", with its decoded meaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub hash: TxHash,
    pub request: TxRequest,
    /// Set when the calldata is a splitter call.
    pub split: Option<SplitCall>,
    /// Set when the calldata is an ERC20 `approve(spender, amount)`.
    pub approve: Option<(Address, U256)>,
}

struct NullToken {
    metadata: TokenMetadata,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

struct ChainState {
    chain_id: ChainId,
    accounts: Vec<Address>,
    tokens: HashMap<Address, NullToken>,
    sent: Vec<SentTransaction>,
    reverted: HashSet<TxHash>,
    reject_sends: usize,
    revert_sends: usize,
    apply_approvals: bool,
    read_failures: usize,
}

/// An in-memory chain implementing every provider trait.
///
/// - `approve` transactions update the stored allowance immediately (as if mined),
///   unless [`NullChain::hold_approvals`] was called.
/// - Every sent transaction is recorded and decoded for assertions.
/// - Failures are scripted: reject the next N sends, revert the next N sends,
///   fail the next N token reads.
pub struct NullChain {
    state: Mutex<ChainState>,
    resolver: NullResolver,
}

impl NullChain {
    pub fn new(chain_id: ChainId, account: Address) -> Self {
        Self {
            state: Mutex::new(ChainState {
                chain_id,
                accounts: vec![account],
                tokens: HashMap::new(),
                sent: Vec::new(),
                reverted: HashSet::new(),
                reject_sends: 0,
                revert_sends: 0,
                apply_approvals: true,
                read_failures: 0,
            }),
            resolver: NullResolver::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The ENS table backing this chain.
    pub fn ens(&self) -> &NullResolver {
        &self.resolver
    }

    /// Deploy a token with the given metadata.
    pub fn add_token(&self, token: Address, symbol: &str, name: &str, decimals: u8) {
        self.state().tokens.insert(
            token,
            NullToken {
                metadata: TokenMetadata {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    decimals,
                },
                balances: HashMap::new(),
                allowances: HashMap::new(),
            },
        );
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        if let Some(t) = self.state().tokens.get_mut(&token) {
            t.balances.insert(owner, amount);
        }
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        if let Some(t) = self.state().tokens.get_mut(&token) {
            t.allowances.insert((owner, spender), amount);
        }
    }

    /// Reject the next `count` sends, as a wallet whose user clicks "reject" would.
    pub fn reject_next_sends(&self, count: usize) {
        self.state().reject_sends = count;
    }

    /// Accept the next `count` sends but report their receipts as reverted.
    pub fn revert_next_sends(&self, count: usize) {
        self.state().revert_sends = count;
    }

    /// Stop applying `approve` calls to the stored allowance.
    pub fn hold_approvals(&self) {
        self.state().apply_approvals = false;
    }

    /// Fail the next `count` token reads.
    pub fn fail_next_reads(&self, count: usize) {
        self.state().read_failures = count;
    }

    /// All transactions sent so far.
    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state().sent.clone()
    }

    /// Only the splitter calls among the sent transactions.
    pub fn split_calls(&self) -> Vec<(SplitCall, U256)> {
        self.state()
            .sent
            .iter()
            .filter_map(|tx| tx.split.clone().map(|call| (call, tx.request.value)))
            .collect()
    }

    fn take_read_failure(&self) -> Result<(), ChainError> {
        let mut state = self.state();
        if state.read_failures > 0 {
            state.read_failures -= 1;
            return Err(ChainError::Transport("scripted read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for NullChain {
    async fn chain_id(&self) -> Result<ChainId, ChainError> {
        Ok(self.state().chain_id)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state().accounts.clone())
    }
}

#[async_trait]
impl EnsResolver for NullChain {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ChainError> {
        self.resolver.resolve_name(name).await
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ChainError> {
        self.resolver.lookup_address(address).await
    }
}

#[async_trait]
impl TokenReader for NullChain {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        self.take_read_failure()?;
        let state = self.state();
        let token = state
            .tokens
            .get(&token)
            .ok_or_else(|| ChainError::Decode(format!("no contract at {token}")))?;
        Ok(token
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.take_read_failure()?;
        let state = self.state();
        let token = state
            .tokens
            .get(&token)
            .ok_or_else(|| ChainError::Decode(format!("no contract at {token}")))?;
        Ok(token.balances.get(&owner).copied().unwrap_or_default())
    }

    async fn metadata(&self, token: Address) -> Result<TokenMetadata, ChainError> {
        self.take_read_failure()?;
        self.state()
            .tokens
            .get(&token)
            .map(|t| t.metadata.clone())
            .ok_or_else(|| ChainError::Decode(format!("no contract at {token}")))
    }
}

#[async_trait]
impl TransactionSender for NullChain {
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state();
        if state.reject_sends > 0 {
            state.reject_sends -= 1;
            return Err(ChainError::Rpc {
                code: 4001,
                message: "User rejected the request.".into(),
            });
        }

        let nonce = state.sent.len() as u64;
        let mut preimage = request.data.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let hash = keccak256(preimage);

        let split = SplitCall::decode(&request.data);
        let approve = decode_approve(&request.data);

        let reverted = state.revert_sends > 0;
        if reverted {
            state.revert_sends -= 1;
            state.reverted.insert(hash);
        } else if let Some((spender, amount)) = approve {
            if state.apply_approvals {
                if let Some(token) = state.tokens.get_mut(&request.to) {
                    token.allowances.insert((request.from, spender), amount);
                }
            }
        }

        state.sent.push(SentTransaction {
            hash,
            request,
            split,
            approve,
        });
        Ok(hash)
    }

    async fn receipt_status(&self, hash: TxHash) -> Result<Option<bool>, ChainError> {
        let state = self.state();
        if state.reverted.contains(&hash) {
            return Ok(Some(false));
        }
        Ok(state.sent.iter().any(|tx| tx.hash == hash).then_some(true))
    }
}
