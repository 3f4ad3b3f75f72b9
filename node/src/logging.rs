//! # Structured Logging
//!
//! One `tracing` subscriber for every command, filtered by `RUST_LOG` when
//! set and by [`DEFAULT_FILTER`] otherwise. The ledger logs each committed
//! transition at `info` and each rejection at `warn`, so the default filter
//! is an audit trail on its own.
//!
//! Logs go to stderr. Stdout carries command results (`report --json`,
//! `history --json`) and must stay parseable.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "real_digital=info,real_digital_protocol=info,tower_http=info";

/// Log output format, selected with `--log-format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// `RUST_LOG` if it parses, else `default_filter`.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(default_filter: &str, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
