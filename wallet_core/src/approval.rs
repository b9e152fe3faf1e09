//! ERC20 allowance bookkeeping for token splits.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use splitter_rpc::abi::encode_approve;
use splitter_rpc::{TokenMetadata, TokenReader, TransactionSender, TxRequest};
use splitter_types::{TokenAmount, TxHash};

use crate::error::SplitError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalSettings {
    /// Extra allowance requested on top of the split total, in basis points.
    pub buffer_bps: u32,
    /// Wait after an accepted approve before the allowance is re-read.
    pub settle_delay: Duration,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            buffer_bps: 100,
            settle_delay: Duration::from_millis(2_000),
        }
    }
}

/// Last known on-chain state for the active token and owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalState {
    /// Owner → splitter allowance. `None` until read.
    pub allowance: Option<U256>,
    pub balance: Option<U256>,
    pub metadata: Option<TokenMetadata>,
}

impl ApprovalState {
    /// Any non-zero allowance counts as approved.
    pub fn is_approved(&self) -> bool {
        self.allowance.is_some_and(|a| !a.is_zero())
    }

    /// Approved for at least `total`.
    pub fn covers(&self, total: U256) -> bool {
        self.is_approved() && self.allowance.is_some_and(|a| a >= total)
    }

    pub fn decimals(&self) -> Option<u8> {
        self.metadata.as_ref().map(|m| m.decimals)
    }
}

/// Gate in front of token splits.
///
/// Tracks which (token, owner, splitter) triple its state belongs to; pointing
/// it at a different triple drops the state.
#[derive(Clone, Debug, Default)]
pub struct ApprovalGate {
    settings: ApprovalSettings,
    token: Option<Address>,
    owner: Option<Address>,
    spender: Option<Address>,
    state: ApprovalState,
}

impl ApprovalGate {
    pub fn new(settings: ApprovalSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> ApprovalSettings {
        self.settings
    }

    /// Point the gate at a token, owner and splitter contract.
    pub fn set_target(
        &mut self,
        token: Option<Address>,
        owner: Option<Address>,
        spender: Option<Address>,
    ) {
        if (token, owner, spender) != (self.token, self.owner, self.spender) {
            self.token = token;
            self.owner = owner;
            self.spender = spender;
            self.invalidate();
        }
    }

    pub fn token(&self) -> Option<Address> {
        self.token
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// The splitter contract the allowance is read for.
    pub fn spender(&self) -> Option<Address> {
        self.spender
    }

    /// Drop cached reads; they must be refreshed before the next split.
    pub fn invalidate(&mut self) {
        self.state = ApprovalState::default();
    }

    pub fn state(&self) -> &ApprovalState {
        &self.state
    }

    pub fn is_approved(&self) -> bool {
        self.state.is_approved()
    }

    pub fn covers(&self, total: U256) -> bool {
        self.state.covers(total)
    }

    /// Read metadata, balance and allowance for the current target.
    ///
    /// Without an owner only metadata is read; without a splitter the
    /// allowance stays unset.
    pub async fn refresh<R>(&mut self, reader: &R) -> Result<&ApprovalState, SplitError>
    where
        R: TokenReader + ?Sized,
    {
        let token = self
            .token
            .ok_or_else(|| SplitError::InputValidation("no token selected".into()))?;

        let metadata = reader.metadata(token).await?;
        let balance = match self.owner {
            Some(owner) => Some(reader.balance_of(token, owner).await?),
            None => None,
        };
        let allowance = match (self.owner, self.spender) {
            (Some(owner), Some(spender)) => Some(reader.allowance(token, owner, spender).await?),
            _ => None,
        };

        tracing::debug!(
            %token,
            symbol = %metadata.symbol,
            ?allowance,
            ?balance,
            "token state refreshed"
        );
        self.state = ApprovalState {
            allowance,
            balance,
            metadata: Some(metadata),
        };
        Ok(&self.state)
    }

    /// Approve the splitter for `amount` plus the configured buffer, wait for
    /// the approval to settle, then re-read the allowance.
    ///
    /// A rejected approve leaves the state untouched.
    pub async fn approve<C>(&mut self, chain: &C, amount: TokenAmount) -> Result<TxHash, SplitError>
    where
        C: TokenReader + TransactionSender + ?Sized,
    {
        let owner = self
            .owner
            .ok_or_else(|| SplitError::Approval("no connected account".into()))?;
        let spender = self
            .spender
            .ok_or_else(|| SplitError::Approval("no splitter contract on this chain".into()))?;
        let token = self
            .token
            .ok_or_else(|| SplitError::Approval("no token selected".into()))?;
        if amount.is_zero() {
            return Err(SplitError::InputValidation(
                "nothing to approve: amount is zero".into(),
            ));
        }
        let buffered = amount
            .with_buffer_bps(self.settings.buffer_bps)
            .ok_or_else(|| SplitError::InputValidation("approve amount overflows".into()))?;

        let request = TxRequest::call(owner, token, encode_approve(spender, buffered.raw()));
        let hash = match chain.send_transaction(request).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(%token, error = %e, "approve rejected");
                return Err(SplitError::Approval(e.to_string()));
            }
        };
        tracing::info!(%token, %spender, amount = %buffered, tx = %hash, "approve submitted");

        tokio::time::sleep(self.settings.settle_delay).await;

        match chain.allowance(token, owner, spender).await {
            Ok(allowance) => {
                tracing::info!(%token, %allowance, "allowance after approve");
                self.state.allowance = Some(allowance);
            }
            Err(e) => {
                tracing::warn!(%token, error = %e, "could not re-read allowance after approve");
                self.state.allowance = None;
            }
        }
        Ok(hash)
    }
}
