//! The split form: user choices plus the derived `can_split`.

use alloy_primitives::Address;
use splitter_rpc::{ChainAccess, EnsResolver, TokenReader, TransactionSender};
use splitter_types::{RecipientAddress, SplitKind, SplitMode, TokenAmount, TxHash};

use crate::address_book::{AddressBook, MergeReport};
use crate::amounts::{self, SplitAmounts};
use crate::approval::{ApprovalGate, ApprovalSettings, ApprovalState};
use crate::error::SplitError;
use crate::submitter::{SplitReceipt, SplitRequest, SplitSubmitter};
use crate::tokens::TokenSelection;

/// Form state for one split.
///
/// Changing the token, the mode or the recipients drops the approval state;
/// call [`SplitForm::refresh_approval`] afterwards.
#[derive(Clone, Debug)]
pub struct SplitForm {
    mode: SplitMode,
    kind: SplitKind,
    token: TokenSelection,
    amount_each: String,
    unequal_csv: String,
    book: AddressBook,
    gate: ApprovalGate,
    account: Option<Address>,
    splitter: Option<Address>,
}

impl SplitForm {
    pub fn new(settings: ApprovalSettings) -> Self {
        Self {
            mode: SplitMode::default(),
            kind: SplitKind::default(),
            token: TokenSelection::Custom(None),
            amount_each: String::new(),
            unequal_csv: String::new(),
            book: AddressBook::new(),
            gate: ApprovalGate::new(settings),
            account: None,
            splitter: None,
        }
    }

    /// Set the sending account and the splitter contract of the connected chain.
    pub fn connect(&mut self, account: Option<Address>, splitter: Option<Address>) {
        self.account = account;
        self.splitter = splitter;
        self.retarget();
    }

    fn retarget(&mut self) {
        let token = match self.mode {
            SplitMode::Token => self.token.address(),
            SplitMode::Eth => None,
        };
        self.gate.set_target(token, self.account, self.splitter);
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SplitMode) {
        if mode != self.mode {
            self.mode = mode;
            self.gate.invalidate();
            self.retarget();
        }
    }

    pub fn kind(&self) -> SplitKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SplitKind) {
        self.kind = kind;
    }

    pub fn token(&self) -> &TokenSelection {
        &self.token
    }

    pub fn select_token(&mut self, token: TokenSelection) {
        if token != self.token {
            self.token = token;
            self.gate.invalidate();
            self.retarget();
        }
    }

    pub fn set_amount_each(&mut self, text: &str) {
        self.amount_each = text.to_string();
    }

    pub fn set_unequal_csv(&mut self, text: &str) {
        self.unequal_csv = text.to_string();
    }

    pub fn book(&self) -> &AddressBook {
        &self.book
    }

    pub fn recipients(&self) -> &[RecipientAddress] {
        self.book.accepted()
    }

    pub async fn add_recipients<R>(&mut self, text: &str, resolver: &R) -> MergeReport
    where
        R: EnsResolver + ?Sized,
    {
        let report = self.book.ingest(text, resolver).await;
        if !report.added.is_empty() {
            self.gate.invalidate();
        }
        report
    }

    pub async fn remove_recipient<R>(
        &mut self,
        index: usize,
        resolver: &R,
    ) -> Result<RecipientAddress, SplitError>
    where
        R: EnsResolver + ?Sized,
    {
        let removed = self.book.remove(index, resolver).await?;
        self.gate.invalidate();
        Ok(removed)
    }

    pub fn clear_recipients(&mut self) {
        self.book.clear();
        self.gate.invalidate();
    }

    pub fn approval(&self) -> &ApprovalState {
        self.gate.state()
    }

    /// Decimals amounts are entered in: 18 for ETH, the token's own otherwise.
    pub fn decimals(&self) -> Option<u8> {
        match self.mode {
            SplitMode::Eth => Some(TokenAmount::ETH_DECIMALS),
            SplitMode::Token => self.gate.state().decimals(),
        }
    }

    /// Amounts for the current input, or why they are not valid yet.
    pub fn amounts(&self) -> Result<SplitAmounts, SplitError> {
        let decimals = self.decimals().ok_or_else(|| {
            SplitError::InputValidation("token decimals unknown; refresh the token first".into())
        })?;
        let text = match self.kind {
            SplitKind::Equal => &self.amount_each,
            SplitKind::Unequal => &self.unequal_csv,
        };
        amounts::reconcile(self.kind, text, decimals, self.book.len())
    }

    /// Whether a split could be submitted right now without approving first.
    pub fn can_split(&self) -> bool {
        if self.book.is_empty() {
            return false;
        }
        let Ok(amounts) = self.amounts() else {
            return false;
        };
        match self.mode {
            SplitMode::Eth => true,
            SplitMode::Token => self.token.address().is_some() && self.gate.covers(amounts.total),
        }
    }

    pub async fn refresh_approval<R>(&mut self, reader: &R) -> Result<&ApprovalState, SplitError>
    where
        R: TokenReader + ?Sized,
    {
        self.gate.refresh(reader).await
    }

    /// Approve the current total (plus buffer) for the splitter.
    pub async fn approve<C>(&mut self, chain: &C) -> Result<TxHash, SplitError>
    where
        C: TokenReader + TransactionSender + ?Sized,
    {
        if self.mode != SplitMode::Token {
            return Err(SplitError::Approval("ETH splits need no approval".into()));
        }
        let amounts = self.amounts()?;
        self.gate.approve(chain, amounts.total_amount()).await
    }

    /// Build the request for the current form state.
    pub fn split_request(&self, auto_approve: bool) -> Result<SplitRequest, SplitError> {
        let from = self
            .account
            .ok_or_else(|| SplitError::InputValidation("no connected account".into()))?;
        let splitter = self
            .splitter
            .ok_or_else(|| SplitError::Config("no splitter contract for this chain".into()))?;
        Ok(SplitRequest {
            mode: self.mode,
            token: match self.mode {
                SplitMode::Token => self.token.address(),
                SplitMode::Eth => None,
            },
            recipients: self.book.accepted().to_vec(),
            amounts: self.amounts()?,
            from,
            splitter,
            auto_approve,
        })
    }

    /// Submit the split through `submitter`.
    pub async fn submit<C>(
        &mut self,
        chain: &C,
        submitter: &mut SplitSubmitter,
        auto_approve: bool,
    ) -> Result<SplitReceipt, SplitError>
    where
        C: ChainAccess + ?Sized,
    {
        let request = self.split_request(auto_approve)?;
        submitter.submit(chain, request, &mut self.gate).await
    }
}
