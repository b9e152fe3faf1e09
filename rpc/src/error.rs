//! Chain access error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid ENS name: {0}")]
    InvalidName(String),

    #[error("no account available from the provider")]
    NoAccount,
}
