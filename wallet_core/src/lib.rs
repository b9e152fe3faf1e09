//! Wallet core library for the token splitter.
//!
//! Provides everything a splitter front end needs:
//! - Recipient parsing, deduplication and ENS resolution ([`AddressBook`])
//! - Equal and per-recipient amount reconciliation ([`amounts`])
//! - ERC20 allowance tracking and approval ([`ApprovalGate`])
//! - Split transaction assembly and submission ([`SplitSubmitter`])
//! - The form model tying them together ([`SplitForm`])
//! - Token lists per chain, configuration and saved contacts

pub mod address_book;
pub mod amounts;
pub mod approval;
pub mod config;
pub mod contacts;
pub mod error;
pub mod form;
pub mod submitter;
pub mod tokens;

pub use address_book::{AddressBook, BatchOutcome, InvalidEntry, MergeReport, ResolutionBatch};
pub use amounts::SplitAmounts;
pub use approval::{ApprovalGate, ApprovalSettings, ApprovalState};
pub use config::{ChainConfig, SplitterConfig};
pub use contacts::{ContactBook, JsonContacts, MemoryContacts, NoContacts};
pub use error::SplitError;
pub use form::SplitForm;
pub use submitter::{SplitReceipt, SplitRequest, SplitSubmitter, SubmissionState, SubmitSettings};
pub use tokens::{TokenInfo, TokenRegistry, TokenSelection};
