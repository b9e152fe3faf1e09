//! Selectable tokens per chain.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use splitter_types::{ChainId, RecipientAddress};
use splitter_utils::abbreviate_address;

use crate::config::SplitterConfig;
use crate::error::SplitError;

/// Symbol of the entry that takes a user-supplied token address.
pub const CUSTOM_SYMBOL: &str = "CUSTOM";

/// A registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    /// `None` only for the custom entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl TokenInfo {
    pub fn new(symbol: &str, name: &str, address: Address) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            address: Some(address),
        }
    }

    pub fn custom() -> Self {
        Self {
            symbol: CUSTOM_SYMBOL.to_string(),
            name: "Custom".to_string(),
            address: None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.address.is_none()
    }
}

/// The token the form currently targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenSelection {
    Listed(TokenInfo),
    /// The custom entry with whatever address the user typed (possibly nothing yet).
    Custom(Option<Address>),
}

impl TokenSelection {
    /// Contract address, if one is known.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Listed(info) => info.address,
            Self::Custom(address) => *address,
        }
    }

    /// Short name for terminal output: the symbol, or the abbreviated contract.
    pub fn label(&self) -> String {
        match self {
            Self::Listed(info) => info.symbol.clone(),
            Self::Custom(Some(address)) => abbreviate_address(&RecipientAddress::new(*address).to_string()),
            Self::Custom(None) => CUSTOM_SYMBOL.to_string(),
        }
    }
}

/// Token lists keyed by chain id, built from configuration.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    by_chain: BTreeMap<ChainId, Vec<TokenInfo>>,
}

impl TokenRegistry {
    pub fn from_config(config: &SplitterConfig) -> Self {
        let mut registry = Self::default();
        for chain in &config.chains {
            registry.insert(chain.chain_id, chain.tokens.clone());
        }
        registry
    }

    /// Replace the list for `chain`. Custom entries in `tokens` are dropped;
    /// the registry appends its own.
    pub fn insert(&mut self, chain: ChainId, tokens: Vec<TokenInfo>) {
        let listed = tokens.into_iter().filter(|t| !t.is_custom()).collect();
        self.by_chain.insert(chain, listed);
    }

    /// Configured tokens for `chain`, followed by the custom entry.
    pub fn tokens_for(&self, chain: ChainId) -> Vec<TokenInfo> {
        let mut tokens = self.by_chain.get(&chain).cloned().unwrap_or_default();
        tokens.push(TokenInfo::custom());
        tokens
    }

    /// Resolve user text to a selection: a listed symbol (case-insensitive),
    /// `CUSTOM`, or a raw contract address.
    pub fn select(&self, chain: ChainId, text: &str) -> Result<TokenSelection, SplitError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(CUSTOM_SYMBOL) {
            return Ok(TokenSelection::Custom(None));
        }
        if let Some(info) = self
            .by_chain
            .get(&chain)
            .and_then(|tokens| tokens.iter().find(|t| t.symbol.eq_ignore_ascii_case(text)))
        {
            return Ok(TokenSelection::Listed(info.clone()));
        }
        if text.starts_with("0x") {
            let address = RecipientAddress::parse(text)?;
            return Ok(TokenSelection::Custom(Some(address.as_address())));
        }
        Err(SplitError::InputValidation(format!(
            "unknown token {text:?} on {chain}"
        )))
    }
}
