//! # Ledger Configuration & Constants
//!
//! Every magic number of the Real Digital ledger lives here. Changing the
//! derivation constants after the first reserve is initialized moves every
//! address the ledger has ever written, so treat them as frozen.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// Ticker of the issued token.
pub const TOKEN_SYMBOL: &str = "RD";

/// ISO 4217 code of the collateral currency.
pub const ASSET_CODE: &str = "BRL";

/// Decimal places of the token. 2, same as the centavo.
pub const TOKEN_DECIMALS: u32 = 2;

/// Minor units per major unit (`10^TOKEN_DECIMALS`).
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Largest value any amount, balance or reserve counter may hold. Counters
/// are stored as `u64` but stay within the signed 64-bit range, so they
/// convert losslessly to `i64` for downstream consumers.
pub const MAX_COUNTER: u64 = i64::MAX as u64;

// ---------------------------------------------------------------------------
// Deterministic Addressing
// ---------------------------------------------------------------------------

/// BLAKE3 key-derivation context for account addresses. Acts as the fixed
/// program seed: the same (namespace, owner) pair always lands on the same
/// address, and no other hash in the system can produce it.
pub const ADDRESS_DERIVATION_CONTEXT: &str = "real-digital 2026-01-01 account address v1";

/// BLAKE3 key-derivation context for transition identifiers.
pub const TRANSITION_ID_CONTEXT: &str = "real-digital 2026-01-01 transition id v1";

/// Domain prefix of every request signing payload.
pub const SIGNING_DOMAIN: &[u8] = b"real-digital/request/v1";

/// Namespace tag of the reserve singleton.
pub const RESERVE_NAMESPACE: &str = "reserve";

/// Namespace tag of holder token accounts.
pub const ACCOUNT_NAMESPACE: &str = "account";

/// Namespace tag of consumed deposit references.
pub const DEPOSIT_NAMESPACE: &str = "deposit";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Default per-transaction mint ceiling: R$ 1.000.000,00 in centavos.
pub const DEFAULT_MAX_MINT_PER_TRANSACTION: u64 = 1_000_000 * MINOR_UNITS_PER_MAJOR;

/// Default maximum byte length of a deposit reference or payout descriptor.
pub const DEFAULT_MAX_REFERENCE_LENGTH: usize = 256;

/// Default page size for journal listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Tunables of a [`Ledger`](crate::ledger::Ledger) instance.
///
/// Deserializable from the `[ledger]` table of the node's TOML file; every
/// field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Largest amount, in minor units, a single mint may issue.
    pub max_mint_per_transaction: u64,
    /// Maximum byte length of a deposit reference or payout descriptor.
    pub max_reference_length: usize,
    /// Flush the store to disk after every committed transition.
    pub flush_on_commit: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_mint_per_transaction: DEFAULT_MAX_MINT_PER_TRANSACTION,
            max_reference_length: DEFAULT_MAX_REFERENCE_LENGTH,
            flush_on_commit: true,
        }
    }
}
