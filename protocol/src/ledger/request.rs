//! # Transition Requests
//!
//! The inputs of the state-changing operations. Each request has a
//! canonical [`signing_payload`](MintRequest::signing_payload): the bytes a
//! remote caller signs so the ledger can authenticate them as a
//! [`Caller`](super::Caller).
//!
//! ```text
//! payload = SIGNING_DOMAIN
//!        || len(op) || op
//!        || 0x00                         (no expected sequence)
//!         | 0x01 || expected_sequence    (u64 LE)
//!        || len(field) || field ...
//! ```
//!
//! Amounts enter the payload in normalized decimal form, so `100.5` and
//! `100.50` sign identically.
//!
//! ## Expected sequence
//!
//! A request may name the reserve sequence it was prepared against. The
//! ledger then refuses it with [`LedgerError::Conflict`] if any other
//! transition committed in between. Since every commit bumps the sequence,
//! a signed request that carries an expected sequence can be applied at
//! most once.
//!
//! [`LedgerError::Conflict`]: super::LedgerError::Conflict

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SIGNING_DOMAIN;
use crate::crypto::keys::Identity;

/// Issue tokens against a confirmed fiat deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Holder credited with the new tokens.
    pub recipient: Identity,
    /// Amount in reais; floored to centavos.
    pub amount: Decimal,
    /// Identifier of the fiat deposit (PIX end-to-end id, TED number, ...).
    pub reference_id: String,
    /// Reserve sequence this request was prepared against.
    #[serde(default)]
    pub expected_sequence: Option<u64>,
}

impl MintRequest {
    pub fn new(recipient: Identity, amount: Decimal, reference_id: impl Into<String>) -> Self {
        Self {
            recipient,
            amount,
            reference_id: reference_id.into(),
            expected_sequence: None,
        }
    }

    /// Condition the request on the reserve still being at `sequence`.
    pub fn at_sequence(mut self, sequence: u64) -> Self {
        self.expected_sequence = Some(sequence);
        self
    }

    /// Bytes the issuer signs to submit this request.
    pub fn signing_payload(&self) -> Vec<u8> {
        let amount = self.amount.normalize().to_string();
        signing_payload(
            "mint",
            self.expected_sequence,
            &[
                self.recipient.as_bytes().as_slice(),
                amount.as_bytes(),
                self.reference_id.as_bytes(),
            ],
        )
    }
}

/// Redeem tokens for an off-ledger fiat payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRequest {
    /// Holder whose balance is debited. Must be the caller.
    pub holder: Identity,
    /// Amount in reais; floored to centavos.
    pub amount: Decimal,
    /// Where the fiat is sent (bank account, PIX key, ...).
    pub payout_descriptor: String,
    /// Reserve sequence this request was prepared against.
    #[serde(default)]
    pub expected_sequence: Option<u64>,
}

impl BurnRequest {
    pub fn new(holder: Identity, amount: Decimal, payout_descriptor: impl Into<String>) -> Self {
        Self {
            holder,
            amount,
            payout_descriptor: payout_descriptor.into(),
            expected_sequence: None,
        }
    }

    /// Condition the request on the reserve still being at `sequence`.
    pub fn at_sequence(mut self, sequence: u64) -> Self {
        self.expected_sequence = Some(sequence);
        self
    }

    /// Bytes the holder signs to submit this request.
    pub fn signing_payload(&self) -> Vec<u8> {
        let amount = self.amount.normalize().to_string();
        signing_payload(
            "burn",
            self.expected_sequence,
            &[
                self.holder.as_bytes().as_slice(),
                amount.as_bytes(),
                self.payout_descriptor.as_bytes(),
            ],
        )
    }
}

/// Set or clear the emergency stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRequest {
    pub paused: bool,
    #[serde(default)]
    pub expected_sequence: Option<u64>,
}

impl PauseRequest {
    pub fn new(paused: bool) -> Self {
        Self {
            paused,
            expected_sequence: None,
        }
    }

    pub fn at_sequence(mut self, sequence: u64) -> Self {
        self.expected_sequence = Some(sequence);
        self
    }

    pub fn signing_payload(&self) -> Vec<u8> {
        signing_payload("pause", self.expected_sequence, &[&[u8::from(self.paused)][..]])
    }
}

/// Hand the reserve authority to another identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityTransferRequest {
    pub new_authority: Identity,
    #[serde(default)]
    pub expected_sequence: Option<u64>,
}

impl AuthorityTransferRequest {
    pub fn new(new_authority: Identity) -> Self {
        Self {
            new_authority,
            expected_sequence: None,
        }
    }

    pub fn at_sequence(mut self, sequence: u64) -> Self {
        self.expected_sequence = Some(sequence);
        self
    }

    pub fn signing_payload(&self) -> Vec<u8> {
        signing_payload(
            "transfer_authority",
            self.expected_sequence,
            &[self.new_authority.as_bytes().as_slice()],
        )
    }
}

fn signing_payload(operation: &str, expected_sequence: Option<u64>, fields: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIGNING_DOMAIN.len() + 64);
    out.extend_from_slice(SIGNING_DOMAIN);
    push_field(&mut out, operation.as_bytes());
    match expected_sequence {
        Some(sequence) => {
            out.push(1);
            out.extend_from_slice(&sequence.to_le_bytes());
        }
        None => out.push(0),
    }
    for field in fields {
        push_field(&mut out, field);
    }
    out
}

fn push_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u64).to_le_bytes());
    out.extend_from_slice(field);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn holder() -> Identity {
        Identity::from_bytes([3u8; 32])
    }

    #[test]
    fn equal_amounts_sign_identically() {
        let a = MintRequest::new(holder(), Decimal::from_str("100.5").unwrap(), "PIX1");
        let b = MintRequest::new(holder(), Decimal::from_str("100.50").unwrap(), "PIX1");
        assert_eq!(a.signing_payload(), b.signing_payload());
    }

    #[test]
    fn operation_is_bound_into_payload() {
        let amount = Decimal::from_str("10").unwrap();
        let mint = MintRequest::new(holder(), amount, "X");
        let burn = BurnRequest::new(holder(), amount, "X");
        assert_ne!(mint.signing_payload(), burn.signing_payload());
    }

    #[test]
    fn expected_sequence_changes_payload() {
        let base = BurnRequest::new(holder(), Decimal::ONE, "Bank X");
        let pinned = base.clone().at_sequence(4);
        assert_ne!(base.signing_payload(), pinned.signing_payload());
        assert_ne!(
            pinned.signing_payload(),
            base.clone().at_sequence(5).signing_payload()
        );
    }

    #[test]
    fn payload_starts_with_domain() {
        let payload = PauseRequest::new(true).signing_payload();
        assert!(payload.starts_with(SIGNING_DOMAIN));
        assert_ne!(payload, PauseRequest::new(false).signing_payload());
    }

    #[test]
    fn json_shape_accepts_missing_sequence() {
        let json = format!(
            r#"{{"recipient":"{}","amount":"100.50","reference_id":"PIX1"}}"#,
            holder().to_hex()
        );
        let request: MintRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.amount, Decimal::from_str("100.50").unwrap());
        assert_eq!(request.expected_sequence, None);
    }
}
