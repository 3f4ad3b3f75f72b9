//! # Receipts & the Journal
//!
//! Every committed transition produces a [`Receipt`]: what happened, who
//! asked for it, when it committed, and the reserve as it stood right
//! after. Receipts are appended to the `journal` tree in the same sled
//! transaction as the state change, keyed by the big-endian reserve
//! sequence, so iterating the journal yields transitions in commit order.
//!
//! A receipt's [`TransitionId`] is a BLAKE3 digest over the sequence, the
//! caller and the encoded transition. It identifies the transition to
//! off-ledger systems (the payout desk, the deposit oracle) without
//! exposing storage keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::account::TokenAccount;
use super::error::LedgerResult;
use super::encode;
use super::reserve::Reserve;
use crate::config::TRANSITION_ID_CONTEXT;
use crate::crypto::hash::domain_hash;
use crate::crypto::keys::Identity;

/// Digest identifying one committed transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId([u8; 32]);

impl TransitionId {
    fn compute(sequence: u64, caller: &Identity, transition: &Transition) -> LedgerResult<Self> {
        let encoded = encode(transition)?;
        let sequence = sequence.to_be_bytes();
        Ok(Self(domain_hash(
            TRANSITION_ID_CONTEXT,
            &[&sequence[..], &caller.as_bytes()[..], &encoded[..]],
        )))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransitionId({}…)", &self.to_hex()[..16])
    }
}

impl Serialize for TransitionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TransitionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("transition id must be 32 bytes"))?;
            Ok(Self(bytes))
        } else {
            Ok(Self(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

/// What a committed transition did. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Initialize {
        authority: Identity,
    },
    Mint {
        recipient: Identity,
        amount: u64,
        reference_id: String,
    },
    /// Also the payout obligation handed to the fiat desk.
    Burn {
        holder: Identity,
        amount: u64,
        payout_descriptor: String,
    },
    SetPaused {
        paused: bool,
    },
    TransferAuthority {
        previous: Identity,
        new: Identity,
    },
}

impl Transition {
    /// Short label for logs and listings.
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Initialize { .. } => "initialize",
            Transition::Mint { .. } => "mint",
            Transition::Burn { .. } => "burn",
            Transition::SetPaused { paused: true } => "pause",
            Transition::SetPaused { paused: false } => "unpause",
            Transition::TransferAuthority { .. } => "transfer_authority",
        }
    }

    /// Minor units moved by a mint or burn.
    pub fn amount(&self) -> Option<u64> {
        match self {
            Transition::Mint { amount, .. } | Transition::Burn { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// Record of one committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: TransitionId,
    /// Reserve sequence assigned to this transition.
    pub sequence: u64,
    /// Authenticated identity that submitted it.
    pub caller: Identity,
    pub transition: Transition,
    pub committed_at: DateTime<Utc>,
    /// Reserve record immediately after the transition.
    pub reserve: Reserve,
    /// The token account the transition touched, after the change.
    pub account: Option<TokenAccount>,
}

impl Receipt {
    pub(crate) fn new(
        reserve: Reserve,
        caller: &Identity,
        transition: Transition,
        account: Option<TokenAccount>,
        committed_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        Ok(Self {
            id: TransitionId::compute(reserve.sequence, caller, &transition)?,
            sequence: reserve.sequence,
            caller: *caller,
            transition,
            committed_at,
            reserve,
            account,
        })
    }

    /// Journal key: the sequence, big-endian so sled orders it numerically.
    pub(crate) fn journal_key(sequence: u64) -> [u8; 8] {
        sequence.to_be_bytes()
    }
}

/// Consumed deposit reference, stored at [`Address::deposit`].
///
/// [`Address::deposit`]: crate::address::Address::deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub reference_id: String,
    pub recipient: Identity,
    pub amount: u64,
    /// Sequence of the mint that consumed the reference.
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> Identity {
        Identity::from_bytes([1u8; 32])
    }

    fn mint(amount: u64) -> Transition {
        Transition::Mint {
            recipient: Identity::from_bytes([2u8; 32]),
            amount,
            reference_id: "PIX1".into(),
        }
    }

    fn receipt_at(sequence: u64, transition: Transition) -> Receipt {
        let mut reserve = Reserve::new(authority());
        reserve.sequence = sequence;
        Receipt::new(reserve, &authority(), transition, None, Utc::now()).unwrap()
    }

    #[test]
    fn id_depends_on_sequence_and_content() {
        let a = receipt_at(1, mint(100));
        let b = receipt_at(2, mint(100));
        let c = receipt_at(1, mint(101));
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id, receipt_at(1, mint(100)).id);
    }

    #[test]
    fn journal_keys_sort_numerically() {
        assert!(Receipt::journal_key(255) < Receipt::journal_key(256));
        assert!(Receipt::journal_key(9) < Receipt::journal_key(10));
    }

    #[test]
    fn receipt_survives_bincode() {
        let receipt = receipt_at(7, mint(10050));
        let bytes = bincode::serialize(&receipt).unwrap();
        let back: Receipt = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, receipt);
    }

    #[test]
    fn json_uses_snake_case_tags_and_hex_ids() {
        let receipt = receipt_at(3, Transition::SetPaused { paused: true });
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["id"].as_str().unwrap(), receipt.id.to_hex());
        assert_eq!(json["transition"]["set_paused"]["paused"], true);
        assert_eq!(receipt.transition.label(), "pause");
    }
}
