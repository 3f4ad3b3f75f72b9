//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for identities and request signatures.
//! - **BLAKE3** for deterministic addresses and transition identifiers.
//!
//! Nothing in here is novel, and nothing should be.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::domain_hash;
pub use keys::{Identity, KeyError, Keypair, Signature};
pub use signatures::{verify, SignatureError};
