// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Real Digital Operator
//!
//! Entry point for the `real-digital` binary. Parses CLI arguments, loads the
//! node config, opens the ledger in the data directory and runs one command.
//!
//! Layout of the data directory:
//!
//! - `ledger/`         the sled database
//! - `authority.key`   default signing key (hex, mode 0600)
//! - `config.toml`     optional, see [`config`]

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use real_digital_protocol::amount::{format_minor, format_signed_minor, parse_major};
use real_digital_protocol::config::{ASSET_CODE, TOKEN_SYMBOL};
use real_digital_protocol::ledger::{AuthorityTransferRequest, PauseRequest, Transition};
use real_digital_protocol::{
    Address, AuditReport, BurnRequest, Caller, Identity, Keypair, Ledger, LedgerError,
    MintRequest, Receipt,
};

use cli::{Commands, KeyArgs, RealDigitalCli};
use config::NodeConfig;
use metrics::LedgerMetrics;

/// Key file used when `--key` is not given.
const DEFAULT_KEY_FILE: &str = "authority.key";

/// Database directory inside the data directory.
const LEDGER_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RealDigitalCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format)?;

    let config = NodeConfig::load(cli.config.as_deref(), &cli.data_dir)?;
    let data_dir = cli.data_dir.as_path();

    match cli.command {
        Commands::Init(args) => init_reserve(data_dir, &config, &args),
        Commands::Keygen(args) => {
            let keypair = Keypair::generate();
            write_keypair(&args.out, &keypair, args.force)?;
            println!("{}", keypair.identity());
            Ok(())
        }
        Commands::Issue(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            let caller = Caller::from_keypair(&load_signer(data_dir, &args.key)?);
            let recipient = parse_identity(&args.recipient)?;
            let amount = parse_major(&args.amount)
                .with_context(|| format!("invalid amount {:?}", args.amount))?;
            let request = MintRequest::new(recipient, amount, args.reference);
            let receipt = ledger.mint(&request, &caller)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::Redeem(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            let caller = Caller::from_keypair(&load_keypair(&args.key)?);
            let holder = parse_identity(&args.holder)?;
            let amount = parse_major(&args.amount)
                .with_context(|| format!("invalid amount {:?}", args.amount))?;
            let request = BurnRequest::new(holder, amount, args.payout);
            let receipt = ledger.burn(&request, &caller)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::Report(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            let report = ledger.audit()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            report.ensure_healthy()?;
            Ok(())
        }
        Commands::Pause(args) => set_paused(data_dir, &config, &args, true),
        Commands::Unpause(args) => set_paused(data_dir, &config, &args, false),
        Commands::TransferAuthority(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            let caller = Caller::from_keypair(&load_signer(data_dir, &args.key)?);
            let new_authority = parse_identity(&args.new_authority)?;
            let receipt = ledger
                .transfer_authority(&AuthorityTransferRequest::new(new_authority), &caller)?;
            print_receipt(&receipt);
            Ok(())
        }
        Commands::Balance(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            let holder = parse_identity(&args.holder)?;
            let balance = ledger.balance_of(&holder)?;
            println!("{} {}", format_minor(balance), TOKEN_SYMBOL);
            Ok(())
        }
        Commands::History(args) => {
            let ledger = open_ledger(data_dir, &config)?;
            for receipt in ledger.receipts(args.limit)? {
                if args.json {
                    println!("{}", serde_json::to_string(&receipt)?);
                } else {
                    print_history_line(&receipt);
                }
            }
            Ok(())
        }
        Commands::Serve(args) => {
            let mut config = config;
            if let Some(port) = args.api_port {
                config.server.api_port = port;
            }
            if let Some(port) = args.metrics_port {
                config.server.metrics_port = port;
            }
            if let Some(secs) = args.audit_interval_secs {
                config.server.audit_interval_secs = secs;
            }
            serve(data_dir, config).await
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Create the reserve, generating the authority key first if needed.
fn init_reserve(data_dir: &Path, config: &NodeConfig, args: &KeyArgs) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let key_path = key_path(data_dir, args);
    let keypair = if key_path.exists() {
        load_keypair(&key_path)?
    } else {
        let keypair = Keypair::generate();
        write_keypair(&key_path, &keypair, false)?;
        tracing::info!(path = %key_path.display(), "authority key generated");
        keypair
    };

    let ledger = open_ledger(data_dir, config)?;
    let receipt = ledger.initialize(&Caller::from_keypair(&keypair))?;

    println!("Reserve initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Reserve        : {}", Address::reserve());
    println!("  Authority      : {}", keypair.identity());
    println!("  Authority key  : {}", key_path.display());
    println!("  Transition     : {}", receipt.id);
    Ok(())
}

fn set_paused(data_dir: &Path, config: &NodeConfig, args: &KeyArgs, paused: bool) -> Result<()> {
    let ledger = open_ledger(data_dir, config)?;
    let caller = Caller::from_keypair(&load_signer(data_dir, args)?);
    let receipt = ledger.set_paused(&PauseRequest::new(paused), &caller)?;
    print_receipt(&receipt);
    Ok(())
}

/// Run the API, the metrics endpoint and the periodic audit until a
/// shutdown signal arrives.
async fn serve(data_dir: &Path, config: NodeConfig) -> Result<()> {
    let ledger = Arc::new(open_ledger(data_dir, &config)?);
    let metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);

    match ledger.fetch() {
        Ok(reserve) => metrics.observe_reserve(&reserve),
        Err(LedgerError::NotInitialized) => {
            tracing::warn!("reserve not initialized; mint and burn will fail until `init` runs")
        }
        Err(e) => return Err(e.into()),
    }

    let server = &config.server;
    tracing::info!(
        api_port = server.api_port,
        metrics_port = server.metrics_port,
        audit_interval_secs = server.audit_interval_secs,
        data_dir = %data_dir.display(),
        "starting real-digital"
    );

    let api_router = api::create_router(api::AppState {
        ledger: Arc::clone(&ledger),
        metrics: Arc::clone(&metrics),
    });
    let api_addr = format!("{}:{}", server.bind, server.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    tracing::info!("API server listening on {}", api_addr);

    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&metrics));
    let metrics_addr = format!("{}:{}", server.bind, server.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    let audit_loop = tokio::spawn(audit_loop(
        Arc::clone(&ledger),
        Arc::clone(&metrics),
        Duration::from_secs(server.audit_interval_secs.max(1)),
    ));

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    audit_loop.abort();
    ledger.flush()?;
    tracing::info!("real-digital stopped");
    Ok(())
}

/// Audit the reserve every `period` and publish the outcome.
async fn audit_loop(ledger: Arc<Ledger>, metrics: Arc<LedgerMetrics>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match ledger.audit() {
            Ok(report) => {
                metrics.record_audit(&report);
                if let Err(e) = report.ensure_healthy() {
                    tracing::error!(sequence = report.sequence, error = %e, "reserve audit failed");
                } else {
                    tracing::debug!(sequence = report.sequence, "reserve audit passed");
                }
            }
            Err(LedgerError::NotInitialized) => tracing::debug!("audit skipped, no reserve yet"),
            Err(e) => tracing::error!(error = %e, "audit could not read the reserve"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_ledger(data_dir: &Path, config: &NodeConfig) -> Result<Ledger> {
    let path = data_dir.join(LEDGER_DIR);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create ledger directory {}", path.display()))?;
    Ledger::open(&path, config.ledger.clone()).with_context(|| {
        format!(
            "failed to open ledger at {} (is `serve` running on this data directory?)",
            path.display()
        )
    })
}

fn key_path(data_dir: &Path, args: &KeyArgs) -> PathBuf {
    args.key
        .clone()
        .unwrap_or_else(|| data_dir.join(DEFAULT_KEY_FILE))
}

fn load_signer(data_dir: &Path, args: &KeyArgs) -> Result<Keypair> {
    load_keypair(&key_path(data_dir, args))
}

fn load_keypair(path: &Path) -> Result<Keypair> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Keypair::from_hex(&content).with_context(|| format!("bad key file {}", path.display()))
}

/// Write a hex secret key readable by the owner only.
fn write_keypair(path: &Path, keypair: &Keypair, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create key file {}", path.display()))?;

    // `mode` only applies to new files; an overwritten one keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if force {
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict {}", path.display()))?;
        }
    }

    file.write_all(keypair.to_hex().as_bytes())
        .with_context(|| format!("failed to write key file {}", path.display()))?;
    Ok(())
}

fn parse_identity(text: &str) -> Result<Identity> {
    Identity::from_hex(text).with_context(|| format!("invalid identity {text:?}"))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_receipt(receipt: &Receipt) {
    println!("Committed {} at sequence {}.", receipt.transition.label(), receipt.sequence);
    println!("  Transition   : {}", receipt.id);
    if let Some(amount) = receipt.transition.amount() {
        println!("  Amount       : {} {}", format_minor(amount), TOKEN_SYMBOL);
    }
    if let Some(account) = &receipt.account {
        println!(
            "  Balance      : {} {} ({})",
            format_minor(account.balance),
            TOKEN_SYMBOL,
            account.holder
        );
    }
    match &receipt.transition {
        Transition::Burn { payout_descriptor, amount, .. } => {
            println!(
                "  Payout owed  : {} {} to {}",
                format_minor(*amount),
                ASSET_CODE,
                payout_descriptor
            );
        }
        Transition::TransferAuthority { new, .. } => {
            println!("  Authority    : {}", new);
        }
        _ => {}
    }
    println!(
        "  Supply       : {} {}",
        format_minor(receipt.reserve.total_supply),
        TOKEN_SYMBOL
    );
}

fn print_report(report: &AuditReport) {
    let verdict = |passed: bool| if passed { "ok" } else { "FAILED" };
    println!("Reserve {} at sequence {}", report.reserve_address, report.sequence);
    println!("  Total supply      : {} {}", format_minor(report.total_supply), TOKEN_SYMBOL);
    println!("  BRL reserve       : {} {}", format_minor(report.brl_reserve), ASSET_CODE);
    println!("  Total minted      : {}", format_minor(report.total_minted));
    println!("  Total burned      : {}", format_minor(report.total_burned));
    println!(
        "  Supply identity   : {} (delta {})",
        verdict(report.supply_identity.passed),
        format_signed_minor(report.supply_identity.delta)
    );
    println!(
        "  Collateralization : {} (delta {})",
        verdict(report.collateralization.passed),
        format_signed_minor(report.collateralization.delta)
    );
    println!("  Parity            : {}", report.parity);
    match report.collateral_ratio_bps {
        Some(bps) => println!("  Collateral ratio  : {} bps", bps),
        None => println!("  Collateral ratio  : n/a (no supply)"),
    }
    println!("  Paused            : {}", report.is_paused);
    println!(
        "  Status            : {}",
        if report.healthy { "HEALTHY" } else { "UNHEALTHY" }
    );
}

fn print_history_line(receipt: &Receipt) {
    let amount = receipt
        .transition
        .amount()
        .map(format_minor)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>6}  {}  {:<18}  {:>16}  {}",
        receipt.sequence,
        receipt.committed_at.format("%Y-%m-%d %H:%M:%S"),
        receipt.transition.label(),
        amount,
        receipt.caller
    );
}

fn print_version() {
    println!("real-digital {}", env!("CARGO_PKG_VERSION"));
    println!("token        {} (1:1 {})", TOKEN_SYMBOL, ASSET_CODE);
    println!("rustc        {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
