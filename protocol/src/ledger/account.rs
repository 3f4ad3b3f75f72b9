//! # Token Balance Store
//!
//! Holder balances live in the `accounts` tree, keyed by
//! [`Address::account`]. An account is created the first time a holder is
//! credited and is never deleted; a fully redeemed holder keeps a
//! zero-balance record.
//!
//! `credit` and `debit` operate on a [`TransactionalTree`] so that the
//! balance change commits in the same sled transaction as the reserve
//! update, or not at all.

use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};

use super::error::LedgerError;
use super::{abort, decode, encode};
use crate::address::Address;
use crate::config::MAX_COUNTER;
use crate::crypto::keys::Identity;

/// A holder's balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    /// The holder this account belongs to. A back-reference; the record is
    /// stored at the holder's derived address.
    pub holder: Identity,
    /// Balance in minor units.
    pub balance: u64,
}

impl TokenAccount {
    /// An empty account for `holder`.
    pub fn new(holder: Identity) -> Self {
        Self { holder, balance: 0 }
    }

    /// Derived address this account is stored at.
    pub fn address(&self) -> Address {
        Address::account(&self.holder)
    }
}

/// Read the account of `holder` inside a transaction.
pub(crate) fn load(
    accounts: &TransactionalTree,
    holder: &Identity,
) -> ConflictableTransactionResult<Option<TokenAccount>, LedgerError> {
    let address = Address::account(holder);
    match accounts.get(address.as_bytes().as_slice())? {
        Some(bytes) => decode(&bytes).map(Some).or_else(abort),
        None => Ok(None),
    }
}

fn store(
    accounts: &TransactionalTree,
    account: &TokenAccount,
) -> ConflictableTransactionResult<(), LedgerError> {
    let bytes = encode(account).or_else(abort)?;
    accounts.insert(account.address().as_bytes().as_slice(), bytes)?;
    Ok(())
}

/// Add `amount` to the holder's balance, creating the account on first
/// credit.
pub(crate) fn credit(
    accounts: &TransactionalTree,
    holder: &Identity,
    amount: u64,
) -> ConflictableTransactionResult<TokenAccount, LedgerError> {
    let mut account = load(accounts, holder)?.unwrap_or_else(|| TokenAccount::new(*holder));
    account.balance = match account
        .balance
        .checked_add(amount)
        .filter(|balance| *balance <= MAX_COUNTER)
    {
        Some(balance) => balance,
        None => return abort(LedgerError::Overflow("balance")),
    };
    store(accounts, &account)?;
    Ok(account)
}

/// Subtract `amount` from the holder's balance.
///
/// Fails with `AccountNotFound` when the holder was never credited and
/// with `InsufficientBalance` when the balance does not cover `amount`.
pub(crate) fn debit(
    accounts: &TransactionalTree,
    holder: &Identity,
    amount: u64,
) -> ConflictableTransactionResult<TokenAccount, LedgerError> {
    let Some(mut account) = load(accounts, holder)? else {
        return abort(LedgerError::AccountNotFound(Address::account(holder)));
    };
    if account.balance < amount {
        return abort(LedgerError::InsufficientBalance {
            balance: account.balance,
            amount,
        });
    }
    account.balance -= amount;
    store(accounts, &account)?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sled::transaction::TransactionError;

    fn temp_tree() -> sled::Tree {
        let db = sled::Config::new().temporary(true).open().unwrap();
        db.open_tree("accounts").unwrap()
    }

    fn holder() -> Identity {
        Identity::from_bytes([5u8; 32])
    }

    #[test]
    fn first_credit_creates_account() {
        let tree = temp_tree();
        let account = tree
            .transaction(|tx| credit(tx, &holder(), 10050))
            .unwrap();
        assert_eq!(account, TokenAccount { holder: holder(), balance: 10050 });
        assert!(tree
            .get(Address::account(&holder()).as_bytes())
            .unwrap()
            .is_some());
    }

    #[test]
    fn credits_accumulate_and_debit_subtracts() {
        let tree = temp_tree();
        tree.transaction(|tx| credit(tx, &holder(), 100)).unwrap();
        tree.transaction(|tx| credit(tx, &holder(), 50)).unwrap();
        let after = tree.transaction(|tx| debit(tx, &holder(), 150)).unwrap();
        // Drained accounts stay behind with a zero balance.
        assert_eq!(after.balance, 0);
        let still_there = tree.transaction(|tx| load(tx, &holder())).unwrap();
        assert_eq!(still_there.map(|a| a.balance), Some(0));
    }

    #[test]
    fn debit_of_unknown_holder_is_not_found() {
        let tree = temp_tree();
        let result = tree.transaction(|tx| debit(tx, &holder(), 1));
        assert!(matches!(
            result,
            Err(TransactionError::Abort(LedgerError::AccountNotFound(_)))
        ));
    }

    #[test]
    fn overdraft_is_rejected_without_write() {
        let tree = temp_tree();
        tree.transaction(|tx| credit(tx, &holder(), 10)).unwrap();
        let result = tree.transaction(|tx| debit(tx, &holder(), 11));
        assert!(matches!(
            result,
            Err(TransactionError::Abort(LedgerError::InsufficientBalance {
                balance: 10,
                amount: 11
            }))
        ));
        let account = tree.transaction(|tx| load(tx, &holder())).unwrap();
        assert_eq!(account.unwrap().balance, 10);
    }

    #[test]
    fn credit_overflow_aborts() {
        let tree = temp_tree();
        tree.transaction(|tx| credit(tx, &holder(), MAX_COUNTER)).unwrap();
        let result = tree.transaction(|tx| credit(tx, &holder(), 1));
        assert!(matches!(
            result,
            Err(TransactionError::Abort(LedgerError::Overflow("balance")))
        ));
    }
}
