//! `splitter`: split ETH or an ERC20 token between many recipients in one transaction.

use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::{bail, Context};
use clap::Parser;
use splitter_rpc::{EthRpcClient, WalletProvider};
use splitter_types::{ChainId, SplitKind, SplitMode, TokenAmount};
use splitter_utils::{init_logging, pluralize, LogFormat};
use splitter_wallet_core::{
    AddressBook, ApprovalGate, JsonContacts, SplitForm, SplitSubmitter, SplitterConfig,
    TokenRegistry, TokenSelection,
};

#[derive(Parser)]
#[command(name = "splitter", about = "Split ETH or ERC20 tokens between recipients")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "SPLITTER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the node or wallet provider.
    #[arg(long, env = "SPLITTER_RPC_URL")]
    rpc_url: Option<String>,

    /// Sending account (defaults to the provider's first account).
    #[arg(long, env = "SPLITTER_FROM")]
    from: Option<Address>,

    /// Splitter contract (defaults to the one configured for the connected chain).
    #[arg(long, env = "SPLITTER_CONTRACT")]
    splitter: Option<Address>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SPLITTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SPLITTER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// List the tokens configured for the connected chain.
    Tokens,

    /// Parse and resolve recipients without sending anything.
    Resolve {
        /// Addresses and ENS names, separated by commas, spaces or newlines.
        recipients: String,
    },

    /// Show balance and splitter allowance for a token.
    Allowance {
        /// Token symbol from the registry, or a contract address.
        #[arg(long)]
        token: String,
    },

    /// Approve the splitter to pull an amount of a token (plus the configured buffer).
    Approve {
        #[arg(long)]
        token: String,

        /// Amount in display units, e.g. "12.5".
        #[arg(long)]
        amount: String,
    },

    /// Send a split.
    Split {
        /// "eth" or "token".
        mode: SplitMode,

        /// Token symbol or address (token mode only).
        #[arg(long)]
        token: Option<String>,

        /// Amount every recipient receives.
        #[arg(long, conflicts_with = "amounts", required_unless_present = "amounts")]
        each: Option<String>,

        /// Per-recipient amounts, in recipient order.
        #[arg(long)]
        amounts: Option<String>,

        /// Addresses and ENS names, separated by commas, spaces or newlines.
        #[arg(long)]
        recipients: String,

        /// Approve the token first if the allowance does not cover the total.
        #[arg(long)]
        approve: bool,

        /// Save the recipients to the configured contacts file on success.
        #[arg(long)]
        save_contacts: bool,

        /// Wait for the receipt and fail if the split reverted.
        #[arg(long)]
        confirm: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<SplitterConfig> {
    let mut config = match cli.config {
        Some(ref path) => SplitterConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SplitterConfig::default(),
    };

    if let Some(ref rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if cli.from.is_some() {
        config.from = cli.from;
    }
    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

/// Connection facts shared by every command.
struct Session {
    client: EthRpcClient,
    config: SplitterConfig,
    chain_id: ChainId,
    account: Option<Address>,
    splitter: Option<Address>,
    registry: TokenRegistry,
}

impl Session {
    async fn connect(config: SplitterConfig, splitter: Option<Address>) -> anyhow::Result<Self> {
        let client = EthRpcClient::new(config.rpc_url.clone(), config.rpc_client_config())?;
        let chain_id = client
            .chain_id()
            .await
            .with_context(|| format!("connecting to {}", client.rpc_url()))?;
        let account = match config.from {
            Some(from) => Some(from),
            None => client.accounts().await?.first().copied(),
        };
        let splitter = splitter.or_else(|| config.splitter_for(chain_id));
        let registry = TokenRegistry::from_config(&config);

        tracing::info!(
            chain = %chain_id,
            account = ?account,
            splitter = ?splitter,
            "connected"
        );
        Ok(Self {
            client,
            config,
            chain_id,
            account,
            splitter,
            registry,
        })
    }

    fn require_account(&self) -> anyhow::Result<Address> {
        self.account
            .context("no account: pass --from or use a provider with unlocked accounts")
    }

    fn token_address(&self, text: &str) -> anyhow::Result<Address> {
        match self.registry.select(self.chain_id, text)? {
            TokenSelection::Custom(None) => bail!("CUSTOM needs a token address instead"),
            selection => selection
                .address()
                .with_context(|| format!("token {text} has no address on {}", self.chain_id)),
        }
    }

    fn gate_for(&self, token: Address) -> ApprovalGate {
        let mut gate = ApprovalGate::new(self.config.approval_settings());
        gate.set_target(Some(token), self.account, self.splitter);
        gate
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    let session = Session::connect(config, cli.splitter).await?;

    match cli.command {
        Command::Tokens => {
            println!("Tokens on {}:", session.chain_id);
            for token in session.registry.tokens_for(session.chain_id) {
                let address = token
                    .address
                    .map(|a| a.to_checksum(None))
                    .unwrap_or_else(|| "<address of your choice>".to_string());
                println!("  {:<8} {:<24} {}", token.symbol, token.name, address);
            }
        }

        Command::Resolve { recipients } => {
            let mut book = AddressBook::new();
            book.ingest(&recipients, &session.client).await;
            println!("Accepted {}:", pluralize(book.len(), "recipient"));
            for recipient in book.accepted() {
                match book.name_of(recipient) {
                    Some(name) => println!("  {recipient}  ({name})"),
                    None => println!("  {recipient}"),
                }
            }
            if !book.invalid().is_empty() {
                println!("Invalid:");
                for entry in book.invalid() {
                    println!("  {entry}");
                }
            }
        }

        Command::Allowance { token } => {
            let token = session.token_address(&token)?;
            let mut gate = session.gate_for(token);
            let state = gate.refresh(&session.client).await?;
            let decimals = state.decimals().unwrap_or(TokenAmount::ETH_DECIMALS);
            let show = |v: Option<alloy_primitives::U256>| {
                v.map(|raw| TokenAmount::new(raw, decimals).to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            if let Some(meta) = &state.metadata {
                println!("Token:     {} ({})", meta.symbol, meta.name);
            }
            println!("Balance:   {}", show(state.balance));
            println!("Allowance: {}", show(state.allowance));
            println!("Approved:  {}", state.is_approved());
        }

        Command::Approve { token, amount } => {
            session.require_account()?;
            let token = session.token_address(&token)?;
            let mut gate = session.gate_for(token);
            let decimals = gate
                .refresh(&session.client)
                .await?
                .decimals()
                .unwrap_or(TokenAmount::ETH_DECIMALS);
            let amount = TokenAmount::parse(&amount, decimals)?;
            let hash = gate.approve(&session.client, amount).await?;
            println!("Approve sent: {hash}");
            match gate.state().allowance {
                Some(allowance) => println!(
                    "Allowance now: {}",
                    TokenAmount::new(allowance, decimals)
                ),
                None => println!("Allowance not yet visible; check again with `splitter allowance`"),
            }
        }

        Command::Split {
            mode,
            token,
            each,
            amounts,
            recipients,
            approve,
            save_contacts,
            confirm,
        } => {
            session.require_account()?;
            let mut form = SplitForm::new(session.config.approval_settings());
            form.connect(session.account, session.splitter);
            form.set_mode(mode);

            if mode == SplitMode::Token {
                let token = token.context("token mode needs --token")?;
                let selection = match session.registry.select(session.chain_id, &token)? {
                    TokenSelection::Custom(None) => bail!("CUSTOM needs a token address instead"),
                    selection => selection,
                };
                form.select_token(selection);
            }

            match (each, amounts) {
                (Some(each), _) => {
                    form.set_kind(SplitKind::Equal);
                    form.set_amount_each(&each);
                }
                (None, Some(list)) => {
                    form.set_kind(SplitKind::Unequal);
                    form.set_unequal_csv(&list);
                }
                (None, None) => bail!("pass --each or --amounts"),
            }

            let report = form.add_recipients(&recipients, &session.client).await;
            if !report.invalid.is_empty() {
                let entries: Vec<String> = report.invalid.iter().map(ToString::to_string).collect();
                bail!("invalid recipients: {}", entries.join(", "));
            }

            if mode == SplitMode::Token {
                form.refresh_approval(&session.client).await?;
            }
            let amounts = form.amounts()?;
            if !form.can_split() && !approve {
                bail!(
                    "allowance does not cover {}; rerun with --approve or run `splitter approve`",
                    amounts.total_amount()
                );
            }

            let mut settings = session.config.submit_settings();
            settings.confirm_receipts |= confirm;
            let mut submitter = SplitSubmitter::new(settings);
            if save_contacts {
                match session.config.contacts_file.clone() {
                    Some(path) => submitter = submitter.with_contacts(Box::new(JsonContacts::new(path))),
                    None => tracing::warn!("--save-contacts ignored: no contacts_file configured"),
                }
            }

            let receipt = form.submit(&session.client, &mut submitter, approve).await?;
            if let Some(approval) = receipt.approval {
                println!("Approve sent: {approval}");
            }
            let unit = match mode {
                SplitMode::Eth => "ETH".to_string(),
                SplitMode::Token => form.token().label(),
            };
            println!(
                "Split sent: {} ({} {unit} to {})",
                receipt.hash,
                amounts.total_amount(),
                pluralize(form.recipients().len(), "recipient")
            );
        }
    }

    Ok(())
}
