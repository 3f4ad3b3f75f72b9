//! # Request Signatures
//!
//! Operations submitted over the network arrive as
//! `(request, claimed identity, signature)`. The signature covers the
//! request's canonical signing payload. This module holds the one place
//! where such envelopes are checked.
//!
//! ## Strictness
//!
//! Verification uses `ed25519-dalek`'s strict mode, which rejects small-order
//! keys and non-canonical signatures. We don't need compatibility with
//! lenient signers, and malleable signatures have no place next to money.

use thiserror::Error;

use super::keys::{Identity, Signature};

/// Errors during signature operations.
///
/// Intentionally vague; the verifier does not explain why a signature
/// failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Verify a signature, returning a `Result` for `?`-friendly call sites.
pub fn verify(identity: &Identity, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
    if identity.verify(message, signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    #[test]
    fn sign_then_verify() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let sig = kp.sign(b"burn 50.00");
        assert_eq!(verify(&kp.identity(), b"burn 50.00", &sig), Ok(()));
    }

    #[test]
    fn verify_rejects_other_identity() {
        let signer = Keypair::from_seed(&[4u8; 32]);
        let other = Keypair::from_seed(&[5u8; 32]);
        let sig = signer.sign(b"burn 50.00");
        assert_eq!(
            verify(&other.identity(), b"burn 50.00", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn verify_rejects_zeroed_signature() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let sig = Signature::from_bytes([0u8; 64]);
        assert!(verify(&kp.identity(), b"anything", &sig).is_err());
    }
}
