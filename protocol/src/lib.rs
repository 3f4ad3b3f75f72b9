// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Real Digital: Core Library
//!
//! A reserve-backed issuance ledger for a BRL-pegged token. The issuer
//! confirms a fiat deposit off-ledger and mints the same amount on-ledger;
//! a holder redeems by burning tokens, which records a fiat payout owed to
//! them. Every centavo in circulation is matched by a centavo in the
//! reserve, and an auditor can prove it from a single record.
//!
//! ## Architecture
//!
//! - **amount**: reais to centavos, floor-only, one function for both
//!   directions.
//! - **address**: deterministic BLAKE3-derived addresses for the reserve,
//!   token accounts, and consumed deposit references.
//! - **crypto**: Ed25519 identities and signatures, domain-separated hashing.
//! - **ledger**: the reserve record, token balances, mint/burn/pause
//!   transitions, authorization policy, receipts. Backed by sled.
//! - **audit**: read-only conservation checks over a reserve snapshot.
//! - **config**: frozen constants and runtime tunables.
//!
//! ## Invariants
//!
//! After every committed transition:
//!
//! 1. `total_supply == total_minted - total_burned`
//! 2. `brl_reserve >= total_supply`
//! 3. the sum of all balances equals `total_supply`
//! 4. every counter is non-negative and the history counters never shrink
//!
//! A failed transition writes nothing.

pub mod address;
pub mod amount;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod ledger;

pub use address::Address;
pub use audit::AuditReport;
pub use config::LedgerConfig;
pub use crypto::keys::{Identity, Keypair};
pub use ledger::{
    BurnRequest, Caller, Ledger, LedgerError, LedgerResult, MintRequest, Receipt, Reserve,
};
