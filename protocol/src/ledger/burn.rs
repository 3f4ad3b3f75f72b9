//! Redemption: destroy a holder's tokens and record the payout owed.

use chrono::Utc;
use tracing::{info, warn};

use super::account;
use super::{
    abort, authorize_burn, check_active, check_sequence, BurnRequest, Caller, Ledger, LedgerError,
    LedgerResult, Receipt, Transition,
};
use crate::amount::{format_minor, to_minor_units};

impl Ledger {
    /// Burn `request.amount` from `request.holder`.
    ///
    /// The holder's balance, `total_supply` and `brl_reserve` shrink by the
    /// floored amount and `total_burned` grows by it. The returned receipt
    /// carries the payout descriptor; settling the fiat is up to the desk
    /// that consumes it. Payout descriptors are not deduplicated: a holder
    /// may redeem to the same bank account any number of times.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `Unauthorized` (caller is not the holder),
    /// `Conflict`, `LedgerPaused`, `InvalidAmount`, `InvalidReference`,
    /// `AccountNotFound`, `InsufficientBalance`, `Overflow`.
    pub fn burn(&self, request: &BurnRequest, caller: &Caller) -> LedgerResult<Receipt> {
        let committed_at = Utc::now();

        let result = self.transact(|tx| {
            let reserve = tx.load_reserve()?;
            authorize_burn(&request.holder, caller).or_else(abort)?;
            check_sequence(&reserve, request.expected_sequence).or_else(abort)?;
            check_active(&reserve).or_else(abort)?;

            let amount = to_minor_units(request.amount)
                .map_err(LedgerError::from)
                .or_else(abort)?;
            let payout_descriptor = self
                .validate_reference("payout descriptor", &request.payout_descriptor)
                .or_else(abort)?;

            let debited = account::debit(tx.accounts, &request.holder, amount)?;
            let next = reserve.after_burn(amount).or_else(abort)?;

            let receipt = Receipt::new(
                next,
                caller.identity(),
                Transition::Burn {
                    holder: request.holder,
                    amount,
                    payout_descriptor: payout_descriptor.to_string(),
                },
                Some(debited),
                committed_at,
            )
            .or_else(abort)?;
            tx.record(&receipt)?;
            Ok(receipt)
        });

        match &result {
            Ok(receipt) => info!(
                holder = %request.holder,
                amount = %format_minor(receipt.transition.amount().unwrap_or_default()),
                payout = %request.payout_descriptor.trim(),
                sequence = receipt.sequence,
                total_supply = receipt.reserve.total_supply,
                "burned, payout owed"
            ),
            Err(e) => warn!(
                holder = %request.holder,
                error = %e,
                "burn rejected"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::crypto::keys::{Identity, Keypair};
    use crate::ledger::{MintRequest, PauseRequest};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn issuer() -> Keypair {
        Keypair::from_seed(&[1u8; 32])
    }

    fn holder_key() -> Keypair {
        Keypair::from_seed(&[2u8; 32])
    }

    fn holder() -> Identity {
        holder_key().identity()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Initialized ledger with R$ 100.50 minted to the holder.
    fn funded() -> (Ledger, Caller, Caller) {
        let ledger = Ledger::open_temporary(LedgerConfig::default()).unwrap();
        let authority = Caller::from_keypair(&issuer());
        ledger.initialize(&authority).unwrap();
        ledger
            .mint(&MintRequest::new(holder(), dec("100.50"), "PIX1"), &authority)
            .unwrap();
        (ledger, authority, Caller::from_keypair(&holder_key()))
    }

    #[test]
    fn burn_debits_holder_and_shrinks_reserve() {
        let (ledger, _, holder_caller) = funded();
        let receipt = ledger
            .burn(&BurnRequest::new(holder(), dec("50.00"), "Bank X"), &holder_caller)
            .unwrap();

        assert_eq!(receipt.account.unwrap().balance, 5050);
        let reserve = ledger.fetch().unwrap();
        assert_eq!(reserve.total_supply, 5050);
        assert_eq!(reserve.brl_reserve, 5050);
        assert_eq!(reserve.total_burned, 5000);
        assert_eq!(reserve.total_minted, 10050);
        assert!(matches!(
            receipt.transition,
            Transition::Burn { ref payout_descriptor, amount: 5000, .. } if payout_descriptor == "Bank X"
        ));
    }

    #[test]
    fn issuer_cannot_burn_for_holder() {
        let (ledger, authority, _) = funded();
        assert!(matches!(
            ledger.burn(&BurnRequest::new(holder(), dec("1.00"), "Bank X"), &authority),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(ledger.balance_of(&holder()).unwrap(), 10050);
    }

    #[test]
    fn overdraft_changes_nothing() {
        let (ledger, _, holder_caller) = funded();
        let before = ledger.fetch().unwrap();
        assert!(matches!(
            ledger.burn(&BurnRequest::new(holder(), dec("200.00"), "Bank X"), &holder_caller),
            Err(LedgerError::InsufficientBalance {
                balance: 10050,
                amount: 20000
            })
        ));
        assert_eq!(ledger.fetch().unwrap(), before);
        assert_eq!(ledger.balance_of(&holder()).unwrap(), 10050);
    }

    #[test]
    fn unknown_holder_is_account_not_found() {
        let (ledger, _, _) = funded();
        let stranger = Keypair::from_seed(&[8u8; 32]);
        let result = ledger.burn(
            &BurnRequest::new(stranger.identity(), dec("1.00"), "Bank Y"),
            &Caller::from_keypair(&stranger),
        );
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }

    #[test]
    fn paused_ledger_refuses_burn() {
        let (ledger, authority, holder_caller) = funded();
        ledger
            .set_paused(&PauseRequest::new(true), &authority)
            .unwrap();
        assert!(matches!(
            ledger.burn(&BurnRequest::new(holder(), dec("1.00"), "Bank X"), &holder_caller),
            Err(LedgerError::LedgerPaused)
        ));
    }

    #[test]
    fn same_payout_descriptor_can_be_reused() {
        let (ledger, _, holder_caller) = funded();
        for _ in 0..2 {
            ledger
                .burn(&BurnRequest::new(holder(), dec("10.00"), "Bank X"), &holder_caller)
                .unwrap();
        }
        assert_eq!(ledger.balance_of(&holder()).unwrap(), 8050);
    }

    #[test]
    fn zero_amount_is_invalid() {
        let (ledger, _, holder_caller) = funded();
        assert!(matches!(
            ledger.burn(&BurnRequest::new(holder(), dec("0.001"), "Bank X"), &holder_caller),
            Err(LedgerError::InvalidAmount(_))
        ));
    }
}
