//! # Deterministic Addresses
//!
//! The ledger never keeps a registry of "which record belongs to whom".
//! Every record lives at an address computed from fixed inputs:
//!
//! ```text
//! address = BLAKE3-derive-key(ADDRESS_DERIVATION_CONTEXT,
//!                             len(namespace) || namespace || len(owner) || owner)
//! ```
//!
//! | Namespace | Owner                 | Record                  |
//! |-----------|-----------------------|-------------------------|
//! | `reserve` | asset code (`BRL`)    | the reserve singleton   |
//! | `account` | holder identity bytes | the holder's balance    |
//! | `deposit` | deposit reference     | consumed-reference mark |
//!
//! Same inputs always produce the same address; different owners collide
//! only with negligible (2^-128) probability. Addresses are shown in base58.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{
    ACCOUNT_NAMESPACE, ADDRESS_DERIVATION_CONTEXT, ASSET_CODE, DEPOSIT_NAMESPACE,
    RESERVE_NAMESPACE,
};
use crate::crypto::hash::domain_hash;
use crate::crypto::keys::Identity;

/// The namespaces an address can be derived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Reserve,
    Account,
    Deposit,
}

impl Namespace {
    /// The tag hashed into every address of this namespace.
    pub fn tag(&self) -> &'static str {
        match self {
            Namespace::Reserve => RESERVE_NAMESPACE,
            Namespace::Account => ACCOUNT_NAMESPACE,
            Namespace::Deposit => DEPOSIT_NAMESPACE,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error parsing a base58 address.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address: {0:?}")]
pub struct AddressParseError(String);

/// A 32-byte derived address. Base58 in human-readable formats, raw bytes
/// otherwise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 32]);

impl Address {
    /// Derive the address of `owner` in `namespace`. Pure; no storage access.
    pub fn derive(namespace: Namespace, owner: &[u8]) -> Self {
        Self(domain_hash(
            ADDRESS_DERIVATION_CONTEXT,
            &[namespace.tag().as_bytes(), owner],
        ))
    }

    /// Address of the reserve singleton.
    pub fn reserve() -> Self {
        Self::derive(Namespace::Reserve, ASSET_CODE.as_bytes())
    }

    /// Address of a holder's token account.
    pub fn account(holder: &Identity) -> Self {
        Self::derive(Namespace::Account, holder.as_bytes())
    }

    /// Address marking a consumed deposit reference.
    pub fn deposit(reference_id: &str) -> Self {
        Self::derive(Namespace::Deposit, reference_id.as_bytes())
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58 encoding.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|_| AddressParseError(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(serde::de::Error::custom)
        } else {
            Ok(Self(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn derivation_is_stable() {
        let holder = Identity::from_bytes([1u8; 32]);
        assert_eq!(Address::account(&holder), Address::account(&holder));
        assert_eq!(Address::reserve(), Address::reserve());
    }

    #[test]
    fn distinct_owners_get_distinct_addresses() {
        let addrs: HashSet<Address> = (0u8..=255)
            .map(|b| Address::account(&Identity::from_bytes([b; 32])))
            .collect();
        assert_eq!(addrs.len(), 256);
    }

    #[test]
    fn namespaces_do_not_overlap() {
        let owner = [7u8; 32];
        let account = Address::derive(Namespace::Account, &owner);
        let deposit = Address::derive(Namespace::Deposit, &owner);
        let reserve = Address::derive(Namespace::Reserve, &owner);
        assert_ne!(account, deposit);
        assert_ne!(account, reserve);
        assert_ne!(deposit, reserve);
    }

    #[test]
    fn helpers_match_generic_derivation() {
        let holder = Identity::from_bytes([9u8; 32]);
        assert_eq!(
            Address::account(&holder),
            Address::derive(Namespace::Account, holder.as_bytes())
        );
        assert_eq!(
            Address::deposit("PIX123"),
            Address::derive(Namespace::Deposit, b"PIX123")
        );
        assert_eq!(
            Address::reserve(),
            Address::derive(Namespace::Reserve, b"BRL")
        );
    }

    #[test]
    fn base58_roundtrip() {
        let addr = Address::reserve();
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn json_uses_base58() {
        let addr = Address::reserve();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
    }

    #[test]
    fn base58_rejects_wrong_length() {
        let short = bs58::encode([1u8; 8]).into_string();
        assert!(short.parse::<Address>().is_err());
        assert!("0OIl".parse::<Address>().is_err());
    }
}
