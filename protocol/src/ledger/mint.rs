//! Issuance: credit a holder against a confirmed fiat deposit.

use chrono::Utc;
use tracing::{info, warn};

use super::account;
use super::{
    abort, authorize_mint, check_active, check_sequence, encode, Caller, DepositRecord, Ledger,
    LedgerError, LedgerResult, MintRequest, Receipt, Transition,
};
use crate::address::Address;
use crate::amount::{format_minor, to_minor_units};

impl Ledger {
    /// Mint `request.amount` to `request.recipient`.
    ///
    /// On success the holder's balance, `total_supply`, `total_minted` and
    /// `brl_reserve` all grow by the floored amount, and the deposit
    /// reference is marked consumed. On any error nothing changes.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `Unauthorized` (caller is not the authority),
    /// `Conflict`, `LedgerPaused`, `InvalidAmount`, `AmountTooLarge`,
    /// `InvalidReference`, `DuplicateReference`, `Overflow`.
    pub fn mint(&self, request: &MintRequest, caller: &Caller) -> LedgerResult<Receipt> {
        let committed_at = Utc::now();
        let limit = self.config.max_mint_per_transaction;

        let result = self.transact(|tx| {
            let reserve = tx.load_reserve()?;
            authorize_mint(&reserve, caller).or_else(abort)?;
            check_sequence(&reserve, request.expected_sequence).or_else(abort)?;
            check_active(&reserve).or_else(abort)?;

            let amount = to_minor_units(request.amount)
                .map_err(LedgerError::from)
                .or_else(abort)?;
            if amount > limit {
                return abort(LedgerError::AmountTooLarge { amount, limit });
            }
            let reference_id = self
                .validate_reference("deposit reference", &request.reference_id)
                .or_else(abort)?;

            let deposit_key = Address::deposit(reference_id);
            if tx
                .deposits
                .get(deposit_key.as_bytes().as_slice())?
                .is_some()
            {
                return abort(LedgerError::DuplicateReference(reference_id.to_string()));
            }

            let next = reserve.after_mint(amount).or_else(abort)?;
            let credited = account::credit(tx.accounts, &request.recipient, amount)?;

            let deposit = DepositRecord {
                reference_id: reference_id.to_string(),
                recipient: request.recipient,
                amount,
                sequence: next.sequence,
            };
            tx.deposits.insert(
                deposit_key.as_bytes().as_slice(),
                encode(&deposit).or_else(abort)?,
            )?;

            let receipt = Receipt::new(
                next,
                caller.identity(),
                Transition::Mint {
                    recipient: request.recipient,
                    amount,
                    reference_id: deposit.reference_id.clone(),
                },
                Some(credited),
                committed_at,
            )
            .or_else(abort)?;
            tx.record(&receipt)?;
            Ok(receipt)
        });

        match &result {
            Ok(receipt) => info!(
                recipient = %request.recipient,
                amount = %format_minor(receipt.transition.amount().unwrap_or_default()),
                reference = %request.reference_id.trim(),
                sequence = receipt.sequence,
                total_supply = receipt.reserve.total_supply,
                "minted"
            ),
            Err(e) => warn!(
                recipient = %request.recipient,
                reference = %request.reference_id,
                error = %e,
                "mint rejected"
            ),
        }
        result
    }
}
