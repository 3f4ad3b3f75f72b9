//! # CLI Interface
//!
//! Command-line structure of the `real-digital` operator binary, defined
//! with `clap` derive. Global flags locate the data directory, the config
//! file and the log format; each subcommand is one ledger operation.
//!
//! Commands other than `serve` open the ledger directly, so stop a running
//! server before using them against the same data directory.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use real_digital_protocol::config::DEFAULT_HISTORY_LIMIT;

use crate::logging::LogFormat;

/// Real Digital reserve ledger operator.
///
/// Issues BRL-backed tokens against confirmed deposits, redeems them for
/// fiat payouts, and audits the reserve.
#[derive(Parser, Debug)]
#[command(
    name = "real-digital",
    about = "Real Digital reserve ledger operator",
    version,
    propagate_version = true
)]
pub struct RealDigitalCli {
    /// Directory holding the ledger database and the authority key.
    #[arg(
        long,
        short = 'd',
        env = "RD_DATA_DIR",
        default_value = "./real-digital-data",
        global = true
    )]
    pub data_dir: PathBuf,

    /// TOML config file. Defaults to `config.toml` in the data directory.
    #[arg(long, short = 'c', env = "RD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(
        long,
        env = "RD_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the reserve. The signing key becomes the authority; a fresh
    /// one is generated in the data directory if none exists.
    Init(KeyArgs),
    /// Generate a keypair file and print its identity.
    Keygen(KeygenArgs),
    /// Mint tokens to a recipient against a confirmed deposit.
    Issue(IssueArgs),
    /// Burn a holder's tokens and record the payout owed.
    Redeem(RedeemArgs),
    /// Audit the reserve. Exits 1 if any check fails.
    Report(ReportArgs),
    /// Stop mint and burn.
    Pause(KeyArgs),
    /// Resume mint and burn.
    Unpause(KeyArgs),
    /// Hand the reserve authority to another identity.
    TransferAuthority(TransferAuthorityArgs),
    /// Print a holder's balance.
    Balance(BalanceArgs),
    /// List recent receipts, newest first.
    History(HistoryArgs),
    /// Run the HTTP API, metrics endpoint and periodic audit.
    Serve(ServeArgs),
    /// Print version information and exit.
    Version,
}

/// Signing key selection. Defaults to `<data-dir>/authority.key`.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Hex key file of the signer.
    #[arg(long, short = 'k', env = "RD_KEY_FILE")]
    pub key: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the key file.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Recipient identity (hex public key).
    pub recipient: String,
    /// Amount in reais, e.g. `100.50`. Digits past the centavo are dropped.
    pub amount: String,
    /// Deposit reference (PIX end-to-end id, TED number, ...).
    pub reference: String,
    #[command(flatten)]
    pub key: KeyArgs,
}

#[derive(Args, Debug)]
pub struct RedeemArgs {
    /// Holder identity (hex public key). Must match `--key`.
    pub holder: String,
    /// Amount in reais.
    pub amount: String,
    /// Where the fiat goes (bank account, PIX key, ...).
    pub payout: String,
    /// Holder's key file.
    #[arg(long, short = 'k')]
    pub key: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TransferAuthorityArgs {
    /// New authority identity (hex public key).
    pub new_authority: String,
    #[command(flatten)]
    pub key: KeyArgs,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Holder identity (hex public key).
    pub holder: String,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of receipts to show.
    #[arg(long, short = 'n', default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,

    /// Print receipts as JSON lines.
    #[arg(long)]
    pub json: bool,
}

/// Overrides for the `[server]` config table.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port for the HTTP API.
    #[arg(long, env = "RD_API_PORT")]
    pub api_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "RD_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Seconds between background audits.
    #[arg(long)]
    pub audit_interval_secs: Option<u64>,
}
