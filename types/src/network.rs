//! Chain identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EIP-155 chain id of the network the wallet is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const MAINNET: Self = Self(1);
    pub const SEPOLIA: Self = Self(11_155_111);
    pub const BASE: Self = Self(8453);
    pub const LOCAL: Self = Self(31_337);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Human-readable name for the chains we know about.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            1 => Some("mainnet"),
            11_155_111 => Some("sepolia"),
            8453 => Some("base"),
            31_337 => Some("local"),
            _ => None,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
