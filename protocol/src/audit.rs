//! # Integrity Audit
//!
//! A read-only check of a [`Reserve`] snapshot against the conservation
//! invariants. The audit never repairs anything: a failing report means the
//! stored record was corrupted or written by something other than the
//! ledger, and the operator has to investigate.
//!
//! | Check              | Passes when                                | Delta                            |
//! |--------------------|--------------------------------------------|----------------------------------|
//! | supply identity    | `total_supply == total_minted - total_burned` | `(minted - burned) - supply` |
//! | collateralization  | `brl_reserve >= total_supply`              | `brl_reserve - total_supply`     |
//!
//! The pause flag, the collateral ratio and 1:1 parity are reported for
//! visibility only and never affect `healthy`. All arithmetic is `i128`
//! over the integer minor-unit counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::address::Address;
use crate::ledger::{LedgerError, LedgerResult, Reserve};

/// Outcome of one pass/fail check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub passed: bool,
    /// Signed difference in minor units; see the module table.
    pub delta: i128,
}

/// Structured audit result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub reserve_address: Address,
    /// Sequence of the audited snapshot.
    pub sequence: u64,
    pub total_supply: u64,
    pub brl_reserve: u64,
    pub total_minted: u64,
    pub total_burned: u64,
    pub supply_identity: CheckOutcome,
    pub collateralization: CheckOutcome,
    pub is_paused: bool,
    /// `brl_reserve == total_supply`.
    pub parity: bool,
    pub collateral_ratio_bps: Option<u64>,
    /// True iff every pass/fail check passed.
    pub healthy: bool,
    pub audited_at: DateTime<Utc>,
}

impl AuditReport {
    /// Turn an unhealthy report into `InvariantViolation`.
    pub fn ensure_healthy(&self) -> LedgerResult<()> {
        if self.healthy {
            return Ok(());
        }
        let mut failures = Vec::new();
        if !self.supply_identity.passed {
            failures.push(format!(
                "supply identity off by {} minor units",
                self.supply_identity.delta
            ));
        }
        if !self.collateralization.passed {
            failures.push(format!(
                "reserve short of supply by {} minor units",
                -self.collateralization.delta
            ));
        }
        Err(LedgerError::InvariantViolation(failures.join("; ")))
    }
}

/// Audit a reserve snapshot.
pub fn audit(reserve: &Reserve) -> AuditReport {
    let supply = reserve.total_supply as i128;
    let collateral = reserve.brl_reserve as i128;
    let issued = reserve.total_minted as i128 - reserve.total_burned as i128;

    let supply_delta = issued - supply;
    let supply_identity = CheckOutcome {
        passed: supply_delta == 0,
        delta: supply_delta,
    };
    let collateral_delta = collateral - supply;
    let collateralization = CheckOutcome {
        passed: collateral_delta >= 0,
        delta: collateral_delta,
    };
    let healthy = supply_identity.passed && collateralization.passed;

    if !healthy {
        warn!(
            sequence = reserve.sequence,
            supply_delta = %supply_delta,
            collateral_delta = %collateral_delta,
            "reserve audit failed"
        );
    }

    AuditReport {
        reserve_address: Address::reserve(),
        sequence: reserve.sequence,
        total_supply: reserve.total_supply,
        brl_reserve: reserve.brl_reserve,
        total_minted: reserve.total_minted,
        total_burned: reserve.total_burned,
        supply_identity,
        collateralization,
        is_paused: reserve.is_paused,
        parity: reserve.brl_reserve == reserve.total_supply,
        collateral_ratio_bps: reserve.collateral_ratio_bps(),
        healthy,
        audited_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Identity;

    fn snapshot(supply: u64, reserve: u64, minted: u64, burned: u64) -> Reserve {
        Reserve {
            total_supply: supply,
            brl_reserve: reserve,
            total_minted: minted,
            total_burned: burned,
            ..Reserve::new(Identity::from_bytes([1u8; 32]))
        }
    }

    #[test]
    fn fresh_reserve_is_healthy() {
        let report = audit(&snapshot(0, 0, 0, 0));
        assert!(report.healthy);
        assert!(report.parity);
        assert_eq!(report.collateral_ratio_bps, None);
        assert!(report.ensure_healthy().is_ok());
    }

    #[test]
    fn overcollateralized_reserve_passes_both_checks() {
        let report = audit(&snapshot(5050, 10050, 10050, 5000));
        assert_eq!(report.supply_identity, CheckOutcome { passed: true, delta: 0 });
        assert_eq!(
            report.collateralization,
            CheckOutcome {
                passed: true,
                delta: 5000
            }
        );
        assert!(report.healthy);
        assert!(!report.parity);
    }

    #[test]
    fn supply_identity_mismatch_fails_with_delta() {
        let report = audit(&snapshot(5050, 5050, 10050, 4000));
        assert!(!report.supply_identity.passed);
        assert_eq!(report.supply_identity.delta, 1000);
        assert!(report.collateralization.passed);
        assert!(!report.healthy);
        assert!(matches!(
            report.ensure_healthy(),
            Err(LedgerError::InvariantViolation(msg)) if msg.contains("1000")
        ));
    }

    #[test]
    fn undercollateralized_reserve_fails() {
        let report = audit(&snapshot(100, 90, 100, 0));
        assert!(report.supply_identity.passed);
        assert_eq!(
            report.collateralization,
            CheckOutcome {
                passed: false,
                delta: -10
            }
        );
        assert!(!report.healthy);
    }

    #[test]
    fn pause_is_informational() {
        let mut reserve = snapshot(0, 0, 0, 0);
        reserve.is_paused = true;
        let report = audit(&reserve);
        assert!(report.is_paused);
        assert!(report.healthy);
    }
}
