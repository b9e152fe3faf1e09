//! Submitting the split transaction.
//!
//! Each submission walks a small state machine:
//!
//! ```text
//! Idle → Validating → (Approving) → Submitting → Settled
//!             ↘            ↘              ↘
//!                         Failed
//! ```
//!
//! `Approving` is only entered when the caller opts in to automatic approval;
//! otherwise an insufficient allowance fails validation. At most one split
//! transaction is sent per submission.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use splitter_rpc::abi::SplitCall;
use splitter_rpc::{ChainAccess, TxRequest};
use splitter_types::{RecipientAddress, SplitKind, SplitMode, TokenAmount, TxHash};
use splitter_utils::pluralize;

use crate::amounts::SplitAmounts;
use crate::approval::ApprovalGate;
use crate::contacts::{ContactBook, NoContacts};
use crate::error::SplitError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitSettings {
    /// Wait for the receipt and fail the submission if it reverted.
    pub confirm_receipts: bool,
    pub receipt_poll_interval: Duration,
    pub receipt_max_polls: u32,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            confirm_receipts: false,
            receipt_poll_interval: Duration::from_millis(1_000),
            receipt_max_polls: 60,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Approving,
    Submitting,
    Settled(TxHash),
    Failed(SplitError),
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Approving => "approving",
            Self::Submitting => "submitting",
            Self::Settled(_) => "settled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Everything needed to send one split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitRequest {
    pub mode: SplitMode,
    /// ERC20 contract; required in token mode, ignored in ETH mode.
    pub token: Option<Address>,
    pub recipients: Vec<RecipientAddress>,
    pub amounts: SplitAmounts,
    pub from: Address,
    pub splitter: Address,
    /// Approve the shortfall instead of failing when the allowance is too low.
    pub auto_approve: bool,
}

impl SplitRequest {
    /// Check preconditions and pick the contract function.
    pub fn to_call(&self) -> Result<SplitCall, SplitError> {
        if self.recipients.is_empty() {
            return Err(SplitError::InputValidation("no recipients".into()));
        }
        if self.amounts.per_recipient.len() != self.recipients.len() {
            return Err(SplitError::InputValidation(format!(
                "{} amounts for {}",
                self.amounts.per_recipient.len(),
                pluralize(self.recipients.len(), "recipient")
            )));
        }
        if self.amounts.per_recipient.iter().any(U256::is_zero) {
            return Err(SplitError::InputValidation(
                "every amount must be greater than zero".into(),
            ));
        }

        let recipients: Vec<Address> = self
            .recipients
            .iter()
            .map(RecipientAddress::as_address)
            .collect();
        let amounts = self.amounts.per_recipient.clone();

        let call = match (self.mode, self.amounts.kind) {
            (SplitMode::Eth, SplitKind::Equal) => SplitCall::EqualEth { recipients },
            (SplitMode::Eth, SplitKind::Unequal) => SplitCall::Eth {
                recipients,
                amounts,
            },
            (SplitMode::Token, kind) => {
                let token = self
                    .token
                    .ok_or_else(|| SplitError::InputValidation("no token selected".into()))?;
                match kind {
                    SplitKind::Equal => SplitCall::EqualErc20 {
                        token,
                        recipients,
                        total: self.amounts.total,
                    },
                    SplitKind::Unequal => SplitCall::Erc20 {
                        token,
                        recipients,
                        amounts,
                    },
                }
            }
        };
        Ok(call)
    }

    /// Native currency attached to the call.
    pub fn value(&self) -> U256 {
        match self.mode {
            SplitMode::Eth => self.amounts.total,
            SplitMode::Token => U256::ZERO,
        }
    }
}

/// A settled split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitReceipt {
    pub hash: TxHash,
    pub call: SplitCall,
    pub value: U256,
    /// Hash of the approve sent on the way, if any.
    pub approval: Option<TxHash>,
}

/// Sends splits and records the state each submission went through.
pub struct SplitSubmitter {
    settings: SubmitSettings,
    contacts: Box<dyn ContactBook>,
    state: SubmissionState,
    history: Vec<SubmissionState>,
}

impl SplitSubmitter {
    pub fn new(settings: SubmitSettings) -> Self {
        Self {
            settings,
            contacts: Box::new(NoContacts),
            state: SubmissionState::Idle,
            history: vec![SubmissionState::Idle],
        }
    }

    /// Save recipients of settled splits to `contacts`.
    pub fn with_contacts(mut self, contacts: Box<dyn ContactBook>) -> Self {
        self.contacts = contacts;
        self
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// States of the latest submission, starting from `Idle`.
    pub fn history(&self) -> &[SubmissionState] {
        &self.history
    }

    fn transition(&mut self, next: SubmissionState) {
        tracing::info!(from = self.state.name(), to = next.name(), "submission state");
        self.history.push(next.clone());
        self.state = next;
    }

    fn fail(&mut self, error: SplitError) -> SplitError {
        tracing::warn!(error = %error, "split failed");
        self.transition(SubmissionState::Failed(error.clone()));
        error
    }

    /// Run one submission to a terminal state.
    pub async fn submit<C>(
        &mut self,
        chain: &C,
        request: SplitRequest,
        gate: &mut ApprovalGate,
    ) -> Result<SplitReceipt, SplitError>
    where
        C: ChainAccess + ?Sized,
    {
        self.state = SubmissionState::Idle;
        self.history = vec![SubmissionState::Idle];

        self.transition(SubmissionState::Validating);
        let call = match request.to_call() {
            Ok(call) => call,
            Err(e) => return Err(self.fail(e)),
        };

        if request.mode.needs_approval() {
            let target = (gate.token(), gate.owner(), gate.spender());
            if target != (request.token, Some(request.from), Some(request.splitter)) {
                return Err(self.fail(SplitError::Approval(
                    "approval state belongs to a different token, account or splitter".into(),
                )));
            }
        }

        let mut approval = None;
        if request.mode.needs_approval() && !gate.covers(request.amounts.total) {
            if !request.auto_approve {
                let total = request.amounts.total_amount();
                return Err(self.fail(SplitError::InputValidation(format!(
                    "allowance does not cover {total}; approve first"
                ))));
            }
            self.transition(SubmissionState::Approving);
            let amount = TokenAmount::new(request.amounts.total, request.amounts.decimals);
            match gate.approve(chain, amount).await {
                Ok(hash) => approval = Some(hash),
                Err(e) => return Err(self.fail(e)),
            }
            if !gate.covers(request.amounts.total) {
                return Err(self.fail(SplitError::Approval(
                    "allowance still below the split total after approve".into(),
                )));
            }
        }

        self.transition(SubmissionState::Submitting);
        let value = request.value();
        let tx = TxRequest::call(request.from, request.splitter, call.encode()).with_value(value);
        let hash = match chain.send_transaction(tx).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(SplitError::Submission(e.to_string()))),
        };
        tracing::info!(
            tx = %hash,
            mode = %request.mode,
            kind = %request.amounts.kind,
            recipients = request.recipients.len(),
            total = %request.amounts.total_amount(),
            "split submitted"
        );

        if self.settings.confirm_receipts {
            if let Err(e) = self.await_receipt(chain, hash).await {
                return Err(self.fail(e));
            }
        }

        if request.mode.needs_approval() {
            gate.invalidate();
        }
        if let Err(e) = self.contacts.save(&request.recipients) {
            tracing::warn!(error = %e, "could not save contacts");
        }

        self.transition(SubmissionState::Settled(hash));
        Ok(SplitReceipt {
            hash,
            call,
            value,
            approval,
        })
    }

    async fn await_receipt<C>(&self, chain: &C, hash: TxHash) -> Result<(), SplitError>
    where
        C: ChainAccess + ?Sized,
    {
        for attempt in 1..=self.settings.receipt_max_polls {
            match chain.receipt_status(hash).await {
                Ok(Some(true)) => {
                    tracing::debug!(tx = %hash, attempt, "split confirmed");
                    return Ok(());
                }
                Ok(Some(false)) => {
                    return Err(SplitError::Submission(format!("transaction {hash} reverted")));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(tx = %hash, attempt, error = %e, "receipt poll failed"),
            }
            tokio::time::sleep(self.settings.receipt_poll_interval).await;
        }
        Err(SplitError::Submission(format!(
            "transaction {hash} not confirmed after {}",
            pluralize(self.settings.receipt_max_polls as usize, "poll")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amounts;
    use crate::approval::ApprovalSettings;
    use crate::contacts::MemoryContacts;
    use splitter_nullables::NullChain;
    use splitter_types::ChainId;
    use std::sync::Arc;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn recipients(bytes: &[u8]) -> Vec<RecipientAddress> {
        bytes.iter().map(|b| RecipientAddress::new(addr(*b))).collect()
    }

    fn eth_request(amounts: SplitAmounts, count: u8) -> SplitRequest {
        SplitRequest {
            mode: SplitMode::Eth,
            token: None,
            recipients: recipients(&(10..10 + count).collect::<Vec<_>>()),
            amounts,
            from: addr(1),
            splitter: addr(3),
            auto_approve: false,
        }
    }

    fn quick_gate() -> ApprovalGate {
        ApprovalGate::new(ApprovalSettings {
            buffer_bps: 100,
            settle_delay: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn eth_equal_sends_value_total() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let request = eth_request(amounts::equal("1", 18, 2).unwrap(), 2);

        let receipt = submitter
            .submit(&chain, request, &mut quick_gate())
            .await
            .unwrap();

        assert_eq!(receipt.value, TokenAmount::ether(2).raw());
        let calls = chain.split_calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0].0, SplitCall::EqualEth { recipients } if recipients.len() == 2));
        assert_eq!(
            submitter.history().iter().map(SubmissionState::name).collect::<Vec<_>>(),
            vec!["idle", "validating", "submitting", "settled"]
        );
    }

    #[tokio::test]
    async fn eth_unequal_uses_split_eth() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let request = eth_request(amounts::unequal("1, 2", 18, 2).unwrap(), 2);

        submitter.submit(&chain, request, &mut quick_gate()).await.unwrap();

        let (call, value) = chain.split_calls().remove(0);
        assert!(matches!(call, SplitCall::Eth { .. }));
        assert_eq!(value, TokenAmount::ether(3).raw());
    }

    #[tokio::test]
    async fn misaligned_request_never_sends() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let request = eth_request(amounts::unequal("1, 2", 18, 2).unwrap(), 3);

        let err = submitter
            .submit(&chain, request, &mut quick_gate())
            .await
            .unwrap_err();

        assert!(matches!(err, SplitError::InputValidation(_)));
        assert!(matches!(submitter.state(), SubmissionState::Failed(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn token_split_without_allowance_fails_validation() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.add_token(addr(2), "DG", "DreadGang", 18);
        let mut gate = quick_gate();
        gate.set_target(Some(addr(2)), Some(addr(1)), Some(addr(3)));
        gate.refresh(&chain).await.unwrap();

        let mut request = eth_request(amounts::equal("1", 18, 2).unwrap(), 2);
        request.mode = SplitMode::Token;
        request.token = Some(addr(2));

        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let err = submitter.submit(&chain, request, &mut gate).await.unwrap_err();
        assert!(matches!(err, SplitError::InputValidation(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn allowance_for_another_token_does_not_count() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.add_token(addr(2), "DG", "DreadGang", 18);
        chain.add_token(addr(4), "UP", "Unicorn Power", 18);
        chain.set_allowance(addr(2), addr(1), addr(3), TokenAmount::ether(100).raw());
        let mut gate = quick_gate();
        gate.set_target(Some(addr(2)), Some(addr(1)), Some(addr(3)));
        gate.refresh(&chain).await.unwrap();
        assert!(gate.covers(TokenAmount::ether(2).raw()));

        let mut request = eth_request(amounts::equal("1", 18, 2).unwrap(), 2);
        request.mode = SplitMode::Token;
        request.token = Some(addr(4));

        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let err = submitter.submit(&chain, request, &mut gate).await.unwrap_err();

        assert!(matches!(err, SplitError::Approval(_)));
        assert!(chain.sent().is_empty());
        assert_eq!(
            submitter.history().iter().map(SubmissionState::name).collect::<Vec<_>>(),
            vec!["idle", "validating", "failed"]
        );
    }

    #[tokio::test]
    async fn allowance_for_another_spender_or_owner_does_not_count() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.add_token(addr(2), "DG", "DreadGang", 18);
        chain.set_allowance(addr(2), addr(1), addr(3), TokenAmount::ether(100).raw());
        let mut gate = quick_gate();
        gate.set_target(Some(addr(2)), Some(addr(1)), Some(addr(3)));
        gate.refresh(&chain).await.unwrap();

        let mut request = eth_request(amounts::equal("1", 18, 2).unwrap(), 2);
        request.mode = SplitMode::Token;
        request.token = Some(addr(2));

        let mut other_splitter = request.clone();
        other_splitter.splitter = addr(5);
        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let err = submitter
            .submit(&chain, other_splitter, &mut gate)
            .await
            .unwrap_err();
        assert!(matches!(err, SplitError::Approval(_)));

        let mut other_owner = request;
        other_owner.from = addr(6);
        let err = submitter
            .submit(&chain, other_owner, &mut gate)
            .await
            .unwrap_err();
        assert!(matches!(err, SplitError::Approval(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn auto_approve_then_split_erc20() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.add_token(addr(2), "DG", "DreadGang", 18);
        let mut gate = quick_gate();
        gate.set_target(Some(addr(2)), Some(addr(1)), Some(addr(3)));
        gate.refresh(&chain).await.unwrap();

        let mut request = eth_request(amounts::equal("1", 18, 3).unwrap(), 3);
        request.mode = SplitMode::Token;
        request.token = Some(addr(2));
        request.auto_approve = true;

        let mut submitter = SplitSubmitter::new(SubmitSettings::default());
        let receipt = submitter.submit(&chain, request, &mut gate).await.unwrap();

        assert!(receipt.approval.is_some());
        assert_eq!(receipt.value, U256::ZERO);
        assert_eq!(chain.sent().len(), 2);
        assert!(matches!(
            chain.split_calls()[0].0,
            SplitCall::EqualErc20 { total, .. } if total == TokenAmount::ether(3).raw()
        ));
        assert!(submitter.history().contains(&SubmissionState::Approving));
        assert_eq!(gate.state().allowance, None);
    }

    #[tokio::test]
    async fn rejected_split_is_a_submission_failure() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.reject_next_sends(1);
        let contacts = Arc::new(MemoryContacts::new());
        let mut submitter = SplitSubmitter::new(SubmitSettings::default())
            .with_contacts(Box::new(contacts.clone()));

        let err = submitter
            .submit(&chain, eth_request(amounts::equal("1", 18, 1).unwrap(), 1), &mut quick_gate())
            .await
            .unwrap_err();

        assert!(matches!(err, SplitError::Submission(_)));
        assert!(contacts.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn settled_split_saves_contacts() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        let contacts = Arc::new(MemoryContacts::new());
        let mut submitter = SplitSubmitter::new(SubmitSettings::default())
            .with_contacts(Box::new(contacts.clone()));

        submitter
            .submit(&chain, eth_request(amounts::equal("1", 18, 2).unwrap(), 2), &mut quick_gate())
            .await
            .unwrap();

        assert_eq!(contacts.load().unwrap(), recipients(&[10, 11]));
    }

    #[tokio::test]
    async fn reverted_receipt_fails_when_confirming() {
        let chain = NullChain::new(ChainId::LOCAL, addr(1));
        chain.revert_next_sends(1);
        let mut submitter = SplitSubmitter::new(SubmitSettings {
            confirm_receipts: true,
            receipt_poll_interval: Duration::ZERO,
            receipt_max_polls: 3,
        });

        let err = submitter
            .submit(&chain, eth_request(amounts::equal("1", 18, 1).unwrap(), 1), &mut quick_gate())
            .await
            .unwrap_err();

        assert!(matches!(err, SplitError::Submission(_)));
        assert_eq!(chain.sent().len(), 1);
    }
}
