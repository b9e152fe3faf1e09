//! Split mode enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SplitterError;

/// What is being distributed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// The chain's native currency, sent as the call value.
    Eth,
    /// An ERC20 token pulled by the splitter contract from the owner's allowance.
    #[default]
    Token,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Token => "token",
        }
    }

    /// Whether an ERC20 allowance must be in place before splitting.
    pub fn needs_approval(&self) -> bool {
        matches!(self, Self::Token)
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = SplitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eth" => Ok(Self::Eth),
            "token" | "erc20" => Ok(Self::Token),
            other => Err(SplitterError::UnknownMode(other.to_string())),
        }
    }
}

/// How the amount is shared between recipients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    /// Every recipient receives the same amount.
    #[default]
    Equal,
    /// Each recipient receives the amount at the same position in an explicit list.
    Unequal,
}

impl SplitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Unequal => "unequal",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitKind {
    type Err = SplitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "unequal" => Ok(Self::Unequal),
            other => Err(SplitterError::UnknownKind(other.to_string())),
        }
    }
}
