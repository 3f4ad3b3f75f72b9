//! Property tests: conservation holds over arbitrary operation sequences.
//!
//! Random mixes of mints, burns (valid and overdrawn), and pause toggles are
//! applied to a fresh ledger. Whatever subset succeeds, the reserve must
//! satisfy every invariant afterwards and the audit must be healthy.

use proptest::prelude::*;
use rust_decimal::Decimal;

use real_digital_protocol::crypto::keys::Keypair;
use real_digital_protocol::ledger::{BurnRequest, Caller, Ledger, MintRequest, PauseRequest};
use real_digital_protocol::LedgerConfig;

#[derive(Debug, Clone)]
enum Op {
    Mint { holder: usize, cents: u64 },
    Burn { holder: usize, cents: u64 },
    Pause(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize, 1..50_000u64).prop_map(|(holder, cents)| Op::Mint { holder, cents }),
        4 => (0..3usize, 1..50_000u64).prop_map(|(holder, cents)| Op::Burn { holder, cents }),
        1 => any::<bool>().prop_map(Op::Pause),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn conservation_holds_after_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let ledger = Ledger::open_temporary(LedgerConfig {
            flush_on_commit: false,
            ..LedgerConfig::default()
        })
        .unwrap();
        let issuer = Keypair::from_seed(&[1u8; 32]);
        let authority = Caller::from_keypair(&issuer);
        ledger.initialize(&authority).unwrap();

        let holders: Vec<Keypair> = (0..3u8).map(|i| Keypair::from_seed(&[10 + i; 32])).collect();
        let mut expected_minted = 0u64;
        let mut expected_burned = 0u64;

        for (n, op) in ops.iter().enumerate() {
            match op {
                Op::Mint { holder, cents } => {
                    let request = MintRequest::new(
                        holders[*holder].identity(),
                        Decimal::new(*cents as i64, 2),
                        format!("DEP-{n}"),
                    );
                    if ledger.mint(&request, &authority).is_ok() {
                        expected_minted += cents;
                    }
                }
                Op::Burn { holder, cents } => {
                    let key = &holders[*holder];
                    let request = BurnRequest::new(
                        key.identity(),
                        Decimal::new(*cents as i64, 2),
                        "Bank X",
                    );
                    if ledger.burn(&request, &Caller::from_keypair(key)).is_ok() {
                        expected_burned += cents;
                    }
                }
                Op::Pause(paused) => {
                    ledger.set_paused(&PauseRequest::new(*paused), &authority).unwrap();
                }
            }
        }

        let reserve = ledger.fetch().unwrap();
        let balances: u64 = holders
            .iter()
            .map(|k| ledger.balance_of(&k.identity()).unwrap())
            .sum();

        prop_assert_eq!(reserve.total_minted, expected_minted);
        prop_assert_eq!(reserve.total_burned, expected_burned);
        prop_assert_eq!(reserve.total_supply, reserve.total_minted - reserve.total_burned);
        prop_assert!(reserve.brl_reserve >= reserve.total_supply);
        prop_assert_eq!(balances, reserve.total_supply);
        prop_assert!(ledger.audit().unwrap().healthy);
    }

    #[test]
    fn minted_amount_is_floored_request(mills in 10u64..10_000_000u64) {
        let ledger = Ledger::open_temporary(LedgerConfig::default()).unwrap();
        let issuer = Keypair::from_seed(&[1u8; 32]);
        let authority = Caller::from_keypair(&issuer);
        ledger.initialize(&authority).unwrap();
        let holder = Keypair::from_seed(&[2u8; 32]).identity();

        let request = MintRequest::new(holder, Decimal::new(mills as i64, 3), "PIX");
        ledger.mint(&request, &authority).unwrap();
        prop_assert_eq!(ledger.balance_of(&holder).unwrap(), mills / 10);
    }
}
