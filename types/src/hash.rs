//! Transaction hash type.

/// A 32-byte transaction hash as returned by `eth_sendTransaction`.
pub type TxHash = alloy_primitives::B256;
