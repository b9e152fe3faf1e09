use splitter_rpc::ChainError;
use splitter_types::SplitterError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// Malformed address or amount text, or a form that is not ready to split.
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("could not resolve {name}: {reason}")]
    Resolution { name: String, reason: String },

    /// Approve rejected, reverted, or impossible (no account, no splitter).
    #[error("approval failed: {0}")]
    Approval(String),

    /// Split transaction rejected or reverted.
    #[error("submission failed: {0}")]
    Submission(String),

    #[error("chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("config error: {0}")]
    Config(String),

    #[error("contacts error: {0}")]
    Contacts(String),
}

impl From<SplitterError> for SplitError {
    fn from(e: SplitterError) -> Self {
        Self::InputValidation(e.to_string())
    }
}
