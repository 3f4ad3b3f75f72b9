//! # The Reserve Ledger
//!
//! [`Ledger`] is the only way to change issuance state. It owns a sled
//! database with four trees:
//!
//! | Tree       | Key                          | Value           |
//! |------------|------------------------------|-----------------|
//! | `reserve`  | [`Address::reserve`]         | [`Reserve`]     |
//! | `accounts` | [`Address::account`]         | [`TokenAccount`]|
//! | `deposits` | [`Address::deposit`]         | [`DepositRecord`]|
//! | `journal`  | sequence (u64 big-endian)    | [`Receipt`]     |
//!
//! Values are bincode-encoded.
//!
//! ## Atomicity
//!
//! Every transition runs as one multi-tree sled transaction. The closure
//! validates, computes the next reserve record, and stages every write; any
//! failure aborts it and nothing is written. sled retries the closure on a
//! write conflict, so two concurrent transitions behave as if applied one
//! after the other, each against the state the other left behind.
//!
//! ## Check order
//!
//! Mint and burn report the *first* failing precondition, in this order:
//! not initialized, unauthorized, stale expected sequence, paused, invalid
//! amount, amount ceiling (mint only), invalid reference, then the
//! operation's own failures (duplicate reference; missing account and
//! insufficient balance), and arithmetic overflow last.

mod account;
mod burn;
mod error;
mod mint;
mod policy;
mod receipt;
mod request;
mod reserve;

pub use account::TokenAccount;
pub use error::{LedgerError, LedgerResult};
pub use policy::{authorize_admin, authorize_burn, authorize_mint, Caller};
pub use receipt::{DepositRecord, Receipt, Transition, TransitionId};
pub use request::{AuthorityTransferRequest, BurnRequest, MintRequest, PauseRequest};
pub use reserve::Reserve;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::{debug, error, info};

use crate::address::Address;
use crate::audit::{self, AuditReport};
use crate::config::LedgerConfig;
use crate::crypto::keys::Identity;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub(crate) fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Abort the enclosing sled transaction with `e`.
pub(crate) fn abort<T>(e: LedgerError) -> ConflictableTransactionResult<T, LedgerError> {
    Err(ConflictableTransactionError::Abort(e))
}

// ---------------------------------------------------------------------------
// Transaction view
// ---------------------------------------------------------------------------

/// The four trees as seen from inside one transaction.
pub(crate) struct Txn<'a> {
    pub reserve: &'a TransactionalTree,
    pub accounts: &'a TransactionalTree,
    pub deposits: &'a TransactionalTree,
    pub journal: &'a TransactionalTree,
}

impl Txn<'_> {
    /// The current reserve, or `NotInitialized`.
    fn load_reserve(&self) -> ConflictableTransactionResult<Reserve, LedgerError> {
        match self.reserve.get(Address::reserve().as_bytes().as_slice())? {
            Some(bytes) => decode(&bytes).or_else(abort),
            None => abort(LedgerError::NotInitialized),
        }
    }

    /// Stage the receipt's reserve snapshot and append the receipt to the
    /// journal.
    fn record(&self, receipt: &Receipt) -> ConflictableTransactionResult<(), LedgerError> {
        let reserve = encode(&receipt.reserve).or_else(abort)?;
        let entry = encode(receipt).or_else(abort)?;
        self.reserve
            .insert(Address::reserve().as_bytes().as_slice(), reserve)?;
        self.journal
            .insert(Receipt::journal_key(receipt.sequence).as_slice(), entry)?;
        Ok(())
    }
}

/// Fail with `Conflict` when the request was prepared against another
/// reserve version.
fn check_sequence(reserve: &Reserve, expected: Option<u64>) -> LedgerResult<()> {
    match expected {
        Some(expected) if expected != reserve.sequence => Err(LedgerError::Conflict {
            expected,
            actual: reserve.sequence,
        }),
        _ => Ok(()),
    }
}

fn check_active(reserve: &Reserve) -> LedgerResult<()> {
    if reserve.is_paused {
        Err(LedgerError::LedgerPaused)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Handle to a reserve ledger.
///
/// Cheap to clone; clones share the same database. sled trees are safe for
/// concurrent use, so a `Ledger` (or an `Arc<Ledger>`) can be shared across
/// threads and tasks without extra locking.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Db,
    reserve: Tree,
    accounts: Tree,
    deposits: Tree,
    journal: Tree,
    config: LedgerConfig,
}

impl Ledger {
    /// Open or create a ledger at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: LedgerConfig) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db, config)
    }

    /// An in-memory ledger that disappears when dropped.
    pub fn open_temporary(config: LedgerConfig) -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, config)
    }

    fn from_db(db: Db, config: LedgerConfig) -> LedgerResult<Self> {
        Ok(Self {
            reserve: db.open_tree("reserve")?,
            accounts: db.open_tree("accounts")?,
            deposits: db.open_tree("deposits")?,
            journal: db.open_tree("journal")?,
            db,
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Force everything committed so far to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Run `f` as one atomic transaction over all four trees.
    fn transact<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: Fn(&Txn<'_>) -> ConflictableTransactionResult<T, LedgerError>,
    {
        self.transact_then(f, || self.flush())
    }

    /// [`transact`](Self::transact) with the post-commit flush supplied by
    /// the caller. Once the transaction commits the result is `Ok`; a
    /// failed flush is logged, never returned.
    fn transact_then<T, F, D>(&self, f: F, flush: D) -> LedgerResult<T>
    where
        F: Fn(&Txn<'_>) -> ConflictableTransactionResult<T, LedgerError>,
        D: FnOnce() -> LedgerResult<()>,
    {
        let outcome = (&self.reserve, &self.accounts, &self.deposits, &self.journal)
            .transaction(|(reserve, accounts, deposits, journal)| {
                f(&Txn {
                    reserve,
                    accounts,
                    deposits,
                    journal,
                })
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => LedgerError::from(e),
            })?;

        if self.config.flush_on_commit {
            if let Err(e) = flush() {
                error!(error = %e, "flush after commit failed; transition stays committed");
            }
        }
        Ok(outcome)
    }

    /// Validate a deposit reference or payout descriptor and return it
    /// trimmed.
    fn validate_reference<'a>(&self, field: &str, text: &'a str) -> LedgerResult<&'a str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidReference(format!("{field} is empty")));
        }
        if trimmed.len() > self.config.max_reference_length {
            return Err(LedgerError::InvalidReference(format!(
                "{field} is {} bytes, limit is {}",
                trimmed.len(),
                self.config.max_reference_length
            )));
        }
        Ok(trimmed)
    }

    // -- Administration -----------------------------------------------------

    /// Create the reserve with the caller as authority and every counter
    /// at zero.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if a reserve record exists.
    pub fn initialize(&self, caller: &Caller) -> LedgerResult<Receipt> {
        let committed_at = Utc::now();
        let authority = *caller.identity();

        let receipt = self.transact(|tx| {
            if tx
                .reserve
                .get(Address::reserve().as_bytes().as_slice())?
                .is_some()
            {
                return abort(LedgerError::AlreadyInitialized);
            }
            let reserve = Reserve::new(authority);
            let receipt = Receipt::new(
                reserve,
                &authority,
                Transition::Initialize { authority },
                None,
                committed_at,
            )
            .or_else(abort)?;
            tx.record(&receipt)?;
            Ok(receipt)
        })?;

        info!(
            authority = %authority,
            reserve = %Address::reserve(),
            "reserve initialized"
        );
        Ok(receipt)
    }

    /// Set or clear the emergency stop. Only mint and burn honor it.
    pub fn set_paused(&self, request: &PauseRequest, caller: &Caller) -> LedgerResult<Receipt> {
        let committed_at = Utc::now();

        let receipt = self.transact(|tx| {
            let reserve = tx.load_reserve()?;
            authorize_admin(&reserve, caller).or_else(abort)?;
            check_sequence(&reserve, request.expected_sequence).or_else(abort)?;

            let next = reserve.with_paused(request.paused).or_else(abort)?;
            let receipt = Receipt::new(
                next,
                caller.identity(),
                Transition::SetPaused {
                    paused: request.paused,
                },
                None,
                committed_at,
            )
            .or_else(abort)?;
            tx.record(&receipt)?;
            Ok(receipt)
        })?;

        info!(
            paused = request.paused,
            sequence = receipt.sequence,
            "reserve pause flag updated"
        );
        Ok(receipt)
    }

    /// Hand mint and admin rights to `request.new_authority`. Allowed while
    /// paused, so a compromised authority can be rotated out during an
    /// incident.
    pub fn transfer_authority(
        &self,
        request: &AuthorityTransferRequest,
        caller: &Caller,
    ) -> LedgerResult<Receipt> {
        let committed_at = Utc::now();

        let receipt = self.transact(|tx| {
            let reserve = tx.load_reserve()?;
            authorize_admin(&reserve, caller).or_else(abort)?;
            check_sequence(&reserve, request.expected_sequence).or_else(abort)?;

            let next = reserve
                .with_authority(request.new_authority)
                .or_else(abort)?;
            let receipt = Receipt::new(
                next,
                caller.identity(),
                Transition::TransferAuthority {
                    previous: reserve.authority,
                    new: request.new_authority,
                },
                None,
                committed_at,
            )
            .or_else(abort)?;
            tx.record(&receipt)?;
            Ok(receipt)
        })?;

        info!(
            previous = %caller.identity(),
            new = %request.new_authority,
            sequence = receipt.sequence,
            "reserve authority transferred"
        );
        Ok(receipt)
    }

    // -- Queries ------------------------------------------------------------

    /// Current reserve record.
    ///
    /// The record is a single stored value, so the snapshot is always
    /// internally consistent.
    pub fn fetch(&self) -> LedgerResult<Reserve> {
        match self.reserve.get(Address::reserve().as_bytes())? {
            Some(bytes) => decode(&bytes),
            None => Err(LedgerError::NotInitialized),
        }
    }

    pub fn is_initialized(&self) -> LedgerResult<bool> {
        Ok(self.reserve.contains_key(Address::reserve().as_bytes())?)
    }

    /// Token account of `holder`, if it was ever credited.
    pub fn account(&self, holder: &Identity) -> LedgerResult<Option<TokenAccount>> {
        match self.accounts.get(Address::account(holder).as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Balance of `holder` in minor units; zero for unknown holders.
    pub fn balance_of(&self, holder: &Identity) -> LedgerResult<u64> {
        Ok(self.account(holder)?.map_or(0, |a| a.balance))
    }

    /// The mint that consumed `reference_id`, if any.
    pub fn deposit(&self, reference_id: &str) -> LedgerResult<Option<DepositRecord>> {
        match self
            .deposits
            .get(Address::deposit(reference_id.trim()).as_bytes())?
        {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Journal entry at `sequence`.
    pub fn receipt(&self, sequence: u64) -> LedgerResult<Option<Receipt>> {
        match self.journal.get(Receipt::journal_key(sequence))? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// The `limit` most recent receipts, newest first.
    pub fn receipts(&self, limit: usize) -> LedgerResult<Vec<Receipt>> {
        let mut out = Vec::with_capacity(limit.min(1024));
        for entry in self.journal.iter().rev().take(limit) {
            let (_key, value) = entry?;
            out.push(decode(&value)?);
        }
        debug!(count = out.len(), "journal read");
        Ok(out)
    }

    /// Audit the current reserve against the conservation invariants.
    pub fn audit(&self) -> LedgerResult<AuditReport> {
        let reserve = self.fetch()?;
        Ok(audit::audit(&reserve))
    }
}
