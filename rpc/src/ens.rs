//! ENS name handling: normalisation, namehash (EIP-137) and reverse nodes.

use alloy_primitives::{address, keccak256, Address, B256};
use unicode_normalization::UnicodeNormalization;

use crate::error::ChainError;

/// The ENS registry, deployed at the same address on mainnet and the public testnets.
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// Suffix that marks a recipient entry as an ENS name rather than a hex address.
pub const ENS_SUFFIX: &str = ".eth";

/// Whether a recipient token should be resolved through ENS.
pub fn is_ens_name(token: &str) -> bool {
    let lower = token.trim().to_lowercase();
    lower.len() > ENS_SUFFIX.len() && lower.ends_with(ENS_SUFFIX)
}

/// Normalise a name before hashing: trim, Unicode NFC, lowercase, no empty labels.
pub fn normalize(name: &str) -> Result<String, ChainError> {
    let normalized: String = name.trim().nfc().collect::<String>().to_lowercase();
    if normalized.is_empty() || normalized.split('.').any(str::is_empty) {
        return Err(ChainError::InvalidName(name.to_string()));
    }
    if normalized.chars().any(char::is_whitespace) {
        return Err(ChainError::InvalidName(name.to_string()));
    }
    Ok(normalized)
}

/// EIP-137 namehash of an already normalised name.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// The `<hex>.addr.reverse` name under which an address's primary name is stored.
pub fn reverse_name(address: Address) -> String {
    format!("{}.addr.reverse", hex::encode(address.as_slice()))
}
