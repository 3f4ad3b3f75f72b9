//! # The Reserve Record
//!
//! One `Reserve` exists per ledger, at [`Address::reserve`]. It is the
//! aggregate every conservation invariant is stated over:
//!
//! ```text
//! total_supply == total_minted - total_burned
//! brl_reserve  >= total_supply
//! total_minted, total_burned never decrease
//! ```
//!
//! The methods here are pure: they take the current record and return the
//! next one, or an error, without touching storage. The ledger writes the
//! returned record only if every other step of the transition succeeded.
//!
//! ## Burn policy
//!
//! A burn lowers `brl_reserve` by the burned amount in the same transition
//! as the supply reduction. The off-chain payout is an obligation recorded
//! on the receipt; it is not reconciled back into the reserve later. Since
//! supply and collateral move by the same amount, a burn never changes
//! `brl_reserve - total_supply`.
//!
//! [`Address::reserve`]: crate::address::Address::reserve

use serde::{Deserialize, Serialize};

use super::error::{LedgerError, LedgerResult};
use crate::config::MAX_COUNTER;
use crate::crypto::keys::Identity;

/// Persisted reserve record. All counters are in minor units and never
/// exceed [`MAX_COUNTER`] (`i64::MAX`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    /// Identity allowed to mint, pause, and hand over authority.
    pub authority: Identity,
    /// Tokens currently in circulation.
    pub total_supply: u64,
    /// Collateral held off-ledger, in centavos.
    pub brl_reserve: u64,
    /// Tokens ever minted.
    pub total_minted: u64,
    /// Tokens ever burned.
    pub total_burned: u64,
    /// Emergency stop for mint and burn.
    pub is_paused: bool,
    /// Sequence of the latest committed transition; initialization is 0.
    /// Doubles as the record's version and the journal key of its receipt.
    pub sequence: u64,
}

impl Reserve {
    /// A fresh reserve: all counters zero, not paused, sequence 0.
    pub fn new(authority: Identity) -> Self {
        Self {
            authority,
            total_supply: 0,
            brl_reserve: 0,
            total_minted: 0,
            total_burned: 0,
            is_paused: false,
            sequence: 0,
        }
    }

    /// The record after minting `amount`: supply, minted counter and
    /// collateral all grow by `amount`.
    pub fn after_mint(&self, amount: u64) -> LedgerResult<Self> {
        Ok(Self {
            total_supply: grow(self.total_supply, amount, "total_supply")?,
            brl_reserve: grow(self.brl_reserve, amount, "brl_reserve")?,
            total_minted: grow(self.total_minted, amount, "total_minted")?,
            ..self.advanced()?
        })
    }

    /// The record after burning `amount`: supply and collateral shrink,
    /// the burned counter grows.
    pub fn after_burn(&self, amount: u64) -> LedgerResult<Self> {
        Ok(Self {
            total_supply: self
                .total_supply
                .checked_sub(amount)
                .ok_or(LedgerError::Overflow("total_supply"))?,
            brl_reserve: self
                .brl_reserve
                .checked_sub(amount)
                .ok_or(LedgerError::Overflow("brl_reserve"))?,
            total_burned: self
                .total_burned
                .checked_add(amount)
                .ok_or(LedgerError::Overflow("total_burned"))?,
            ..self.advanced()?
        })
    }

    /// The record with `is_paused` set.
    pub fn with_paused(&self, paused: bool) -> LedgerResult<Self> {
        Ok(Self {
            is_paused: paused,
            ..self.advanced()?
        })
    }

    /// The record with a new authority.
    pub fn with_authority(&self, authority: Identity) -> LedgerResult<Self> {
        Ok(Self {
            authority,
            ..self.advanced()?
        })
    }

    /// Copy of the record with the sequence bumped by one.
    fn advanced(&self) -> LedgerResult<Self> {
        Ok(Self {
            sequence: self
                .sequence
                .checked_add(1)
                .ok_or(LedgerError::Overflow("sequence"))?,
            ..self.clone()
        })
    }

    /// `brl_reserve / total_supply` in basis points. `None` while nothing is
    /// in circulation.
    pub fn collateral_ratio_bps(&self) -> Option<u64> {
        if self.total_supply == 0 {
            return None;
        }
        let ratio = self.brl_reserve as u128 * 10_000 / self.total_supply as u128;
        Some(ratio.min(u64::MAX as u128) as u64)
    }
}

/// `value + amount`, or `Overflow(field)` past [`MAX_COUNTER`].
fn grow(value: u64, amount: u64, field: &'static str) -> LedgerResult<u64> {
    value
        .checked_add(amount)
        .filter(|sum| *sum <= MAX_COUNTER)
        .ok_or(LedgerError::Overflow(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> Identity {
        Identity::from_bytes([1u8; 32])
    }

    #[test]
    fn new_reserve_is_empty_and_active() {
        let r = Reserve::new(authority());
        assert_eq!(r.total_supply, 0);
        assert_eq!(r.brl_reserve, 0);
        assert_eq!(r.total_minted, 0);
        assert_eq!(r.total_burned, 0);
        assert!(!r.is_paused);
        assert_eq!(r.sequence, 0);
    }

    #[test]
    fn mint_moves_supply_collateral_and_history_together() {
        let r = Reserve::new(authority()).after_mint(10050).unwrap();
        assert_eq!(r.total_supply, 10050);
        assert_eq!(r.brl_reserve, 10050);
        assert_eq!(r.total_minted, 10050);
        assert_eq!(r.total_burned, 0);
        assert_eq!(r.sequence, 1);
    }

    #[test]
    fn burn_moves_supply_and_collateral_down() {
        let r = Reserve::new(authority())
            .after_mint(10050)
            .unwrap()
            .after_burn(5000)
            .unwrap();
        assert_eq!(r.total_supply, 5050);
        assert_eq!(r.brl_reserve, 5050);
        assert_eq!(r.total_minted, 10050);
        assert_eq!(r.total_burned, 5000);
        assert_eq!(r.sequence, 2);
    }

    #[test]
    fn mint_overflow_leaves_original_untouched() {
        let mut r = Reserve::new(authority());
        r.total_supply = u64::MAX - 1;
        r.brl_reserve = u64::MAX - 1;
        r.total_minted = u64::MAX - 1;
        let before = r.clone();
        assert!(matches!(
            r.after_mint(2),
            Err(LedgerError::Overflow("total_supply"))
        ));
        assert_eq!(r, before);
    }

    #[test]
    fn mint_past_signed_range_is_an_overflow() {
        let mut r = Reserve::new(authority());
        r.total_supply = MAX_COUNTER - 10;
        r.brl_reserve = MAX_COUNTER;
        r.total_minted = MAX_COUNTER - 10;
        assert!(matches!(
            r.after_mint(10),
            Err(LedgerError::Overflow("brl_reserve"))
        ));

        r.brl_reserve = MAX_COUNTER - 10;
        let next = r.after_mint(10).unwrap();
        assert_eq!(next.total_supply, i64::MAX as u64);
        assert!(matches!(
            next.after_mint(1),
            Err(LedgerError::Overflow("total_supply"))
        ));
    }

    #[test]
    fn burn_beyond_supply_is_an_overflow() {
        let r = Reserve::new(authority()).after_mint(100).unwrap();
        assert!(matches!(
            r.after_burn(101),
            Err(LedgerError::Overflow("total_supply"))
        ));
    }

    #[test]
    fn pause_and_authority_changes_only_bump_sequence() {
        let r = Reserve::new(authority()).after_mint(500).unwrap();
        let paused = r.with_paused(true).unwrap();
        assert!(paused.is_paused);
        assert_eq!(paused.total_supply, 500);
        assert_eq!(paused.sequence, r.sequence + 1);

        let new_authority = Identity::from_bytes([2u8; 32]);
        let handed = paused.with_authority(new_authority).unwrap();
        assert_eq!(handed.authority, new_authority);
        assert!(handed.is_paused);
        assert_eq!(handed.sequence, r.sequence + 2);
    }

    #[test]
    fn collateral_ratio() {
        let mut r = Reserve::new(authority());
        assert_eq!(r.collateral_ratio_bps(), None);
        r.total_supply = 5050;
        r.brl_reserve = 10050;
        assert_eq!(r.collateral_ratio_bps(), Some(19_900));
        r.brl_reserve = 5050;
        assert_eq!(r.collateral_ratio_bps(), Some(10_000));
    }

    #[test]
    fn bincode_layout_is_stable_size() {
        let r = Reserve::new(authority());
        let bytes = bincode::serialize(&r).unwrap();
        // 32 authority + 5 * 8 counters/sequence + 1 flag.
        assert_eq!(bytes.len(), 32 + 8 * 5 + 1);
    }
}
