//! Recipient address type.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SplitterError;

/// A 20-byte account that can receive a share of a split.
///
/// Equality is byte equality, so the lowercase and the checksummed spelling of
/// the same account are the same recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientAddress(Address);

impl RecipientAddress {
    /// Length of a `0x`-prefixed hex address.
    pub const HEX_LEN: usize = 42;

    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// Parse a `0x`-prefixed hex address.
    ///
    /// Single-case input (all lowercase or all uppercase digits) is accepted as is.
    /// Mixed-case input must carry a valid EIP-55 checksum.
    pub fn parse(raw: &str) -> Result<Self, SplitterError> {
        let s = raw.trim();
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| SplitterError::InvalidAddress(s.to_string()))?;

        if s.len() != Self::HEX_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SplitterError::InvalidAddress(s.to_string()));
        }

        let address =
            Address::from_str(s).map_err(|_| SplitterError::InvalidAddress(s.to_string()))?;

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum(None) != s {
            return Err(SplitterError::BadChecksum(s.to_string()));
        }

        Ok(Self(address))
    }

    pub fn as_address(&self) -> Address {
        self.0
    }

    /// Lowercase `0x`-prefixed hex form.
    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }

    /// EIP-55 checksummed form.
    pub fn to_checksum(&self) -> String {
        self.0.to_checksum(None)
    }
}

impl fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl FromStr for RecipientAddress {
    type Err = SplitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Address> for RecipientAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<RecipientAddress> for Address {
    fn from(recipient: RecipientAddress) -> Self {
        recipient.0
    }
}
