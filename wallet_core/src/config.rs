//! Splitter configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use splitter_rpc::{ens, RpcClientConfig};
use splitter_types::ChainId;
use splitter_utils::LogFormat;

use crate::approval::ApprovalSettings;
use crate::error::SplitError;
use crate::submitter::SubmitSettings;
use crate::tokens::TokenInfo;

/// Per-chain deployment: the splitter contract and the tokens offered there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,

    /// Deployed splitter contract, if there is one on this chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitter: Option<Address>,

    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
}

/// Configuration for the splitter.
///
/// Can be loaded from a TOML file via [`SplitterConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// JSON-RPC endpoint of the node or wallet provider.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Sending account. When unset, the provider's first account is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    /// ENS registry used for name resolution.
    #[serde(default = "default_ens_registry")]
    pub ens_registry: Address,

    /// Extra allowance requested on approve, in basis points.
    #[serde(default = "default_approve_buffer_bps")]
    pub approve_buffer_bps: u32,

    /// Wait between an accepted approve and the allowance re-read.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Poll for the split receipt and fail on revert.
    #[serde(default)]
    pub confirm_receipts: bool,

    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,

    #[serde(default = "default_receipt_max_polls")]
    pub receipt_max_polls: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// JSON file that successful splits save their recipients to. Unset disables contacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts_file: Option<PathBuf>,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Deployments and token lists, one entry per chain.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_ens_registry() -> Address {
    ens::ENS_REGISTRY
}

fn default_approve_buffer_bps() -> u32 {
    100
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_receipt_poll_ms() -> u64 {
    1_000
}

fn default_receipt_max_polls() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SplitterConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, SplitError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SplitError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SplitError> {
        let config: Self = toml::from_str(s).map_err(|e| SplitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SplitError> {
        toml::to_string_pretty(self).map_err(|e| SplitError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SplitError> {
        if self.rpc_url.trim().is_empty() {
            return Err(SplitError::Config("rpc_url must not be empty".into()));
        }
        if self.approve_buffer_bps > 10_000 {
            return Err(SplitError::Config(format!(
                "approve_buffer_bps {} exceeds 10000 (100%)",
                self.approve_buffer_bps
            )));
        }
        if self.confirm_receipts && self.receipt_max_polls == 0 {
            return Err(SplitError::Config(
                "receipt_max_polls must be positive when confirm_receipts is set".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(SplitError::Config(format!(
                    "chain {} is configured twice",
                    chain.chain_id
                )));
            }
        }
        Ok(())
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Splitter contract for `chain_id`, if deployed there.
    pub fn splitter_for(&self, chain_id: ChainId) -> Option<Address> {
        self.chain(chain_id).and_then(|c| c.splitter)
    }

    pub fn rpc_client_config(&self) -> RpcClientConfig {
        RpcClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ens_registry: self.ens_registry,
        }
    }

    pub fn approval_settings(&self) -> ApprovalSettings {
        ApprovalSettings {
            buffer_bps: self.approve_buffer_bps,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn submit_settings(&self) -> SubmitSettings {
        SubmitSettings {
            confirm_receipts: self.confirm_receipts,
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_ms),
            receipt_max_polls: self.receipt_max_polls,
        }
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            from: None,
            ens_registry: default_ens_registry(),
            approve_buffer_bps: default_approve_buffer_bps(),
            settle_delay_ms: default_settle_delay_ms(),
            confirm_receipts: false,
            receipt_poll_ms: default_receipt_poll_ms(),
            receipt_max_polls: default_receipt_max_polls(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            contacts_file: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            chains: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = SplitterConfig::default();
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = SplitterConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.rpc_url, config.rpc_url);
        assert_eq!(parsed.approve_buffer_bps, config.approve_buffer_bps);
        assert_eq!(parsed.ens_registry, config.ens_registry);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = SplitterConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.approve_buffer_bps, 100);
        assert_eq!(config.settle_delay_ms, 2_000);
        assert!(!config.confirm_receipts);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.chains.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            rpc_url = "https://sepolia.example.org"
            settle_delay_ms = 0
            log_format = "json"
        "#;
        let config = SplitterConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.rpc_url, "https://sepolia.example.org");
        assert_eq!(config.settle_delay_ms, 0);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.approve_buffer_bps, 100); // default
    }

    #[test]
    fn chains_carry_splitter_and_tokens() {
        let toml = r#"
            [[chains]]
            chain_id = 11155111
            splitter = "0x1111111111111111111111111111111111111111"

            [[chains.tokens]]
            symbol = "DG"
            name = "DreadGang"
            address = "0x4aA47eD29959c7053996d8f7918db01A62D02ee5"
        "#;
        let config = SplitterConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(
            config.splitter_for(ChainId::SEPOLIA),
            Some(address!("1111111111111111111111111111111111111111"))
        );
        assert_eq!(config.splitter_for(ChainId::MAINNET), None);
        let chain = config.chain(ChainId::SEPOLIA).unwrap();
        assert_eq!(chain.tokens[0].symbol, "DG");
    }

    #[test]
    fn duplicate_chain_is_rejected() {
        let toml = r#"
            [[chains]]
            chain_id = 1
            [[chains]]
            chain_id = 1
        "#;
        assert!(matches!(
            SplitterConfig::from_toml_str(toml),
            Err(SplitError::Config(_))
        ));
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        assert!(SplitterConfig::from_toml_str("approve_buffer_bps = 20000").is_err());
    }

    #[test]
    fn example_config_parses() {
        let config = SplitterConfig::from_toml_str(include_str!("../../splitter.example.toml"))
            .expect("example config should parse");
        let local = config.chain(ChainId::LOCAL).expect("local chain listed");
        assert_eq!(local.tokens.len(), 3);
        assert!(config.chain(ChainId::BASE).is_some());

        let mainnet = config.chain(ChainId::MAINNET).expect("mainnet listed");
        let symbols: Vec<&str> = mainnet.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DG", "UP", "USDC", "DAI", "ENS"]);
        let dai = &mainnet.tokens[3];
        assert_eq!(
            dai.address,
            Some(address!("6B175474E89094C44Da98b954EedeAC495271d0F"))
        );
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("splitter.toml");
        std::fs::write(&path, "receipt_max_polls = 5\nconfirm_receipts = true\n").unwrap();
        let config = SplitterConfig::from_toml_file(&path).expect("should load");
        assert!(config.confirm_receipts);
        assert_eq!(config.submit_settings().receipt_max_polls, 5);
    }
}
