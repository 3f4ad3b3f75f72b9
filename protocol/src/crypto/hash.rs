//! # Hashing Utilities
//!
//! BLAKE3 is the only hash function the ledger uses. It backs two things:
//!
//! - **Deterministic account addresses** (see [`crate::address`]), where a
//!   namespace tag and an owner identity are hashed into a 32-byte address.
//! - **Transition identifiers** on receipts.
//!
//! ## Domain separation
//!
//! Every hash the ledger computes goes through [`domain_hash`], which uses
//! BLAKE3's key-derivation mode with a context string and length-prefixes
//! each input part. Length prefixes rule out ambiguous concatenations such
//! as `("ab", "c")` vs `("a", "bc")`, and distinct contexts keep an address
//! from ever colliding with a transition ID built from the same bytes.

/// Hash a sequence of parts under a fixed context string.
///
/// Each part is written as `len (u64 LE) || bytes`, so the encoding is
/// injective over the list of parts.
///
/// # Example
///
/// ```
/// use real_digital_protocol::crypto::domain_hash;
///
/// let hash = domain_hash("real-digital example", &[b"Real Digital"]);
/// assert_eq!(hash.len(), 32);
/// ```
pub fn domain_hash(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
