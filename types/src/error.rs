//! Error type shared by the fundamental types.

use thiserror::Error;

/// Errors raised while parsing addresses, amounts and modes from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitterError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address checksum mismatch: {0}")]
    BadChecksum(String),

    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("amount overflows 256 bits")]
    AmountOverflow,

    #[error("unknown split mode: {0}")]
    UnknownMode(String),

    #[error("unknown split kind: {0}")]
    UnknownKind(String),
}
