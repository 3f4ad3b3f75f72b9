//! # Authorization Policy
//!
//! Who may do what, in one place:
//!
//! | Operation            | Allowed caller              |
//! |----------------------|-----------------------------|
//! | initialize           | anyone (becomes authority)  |
//! | mint                 | the reserve authority       |
//! | burn                 | the holder being debited    |
//! | pause / unpause      | the reserve authority       |
//! | transfer authority   | the reserve authority       |
//!
//! Issuance is issuer-gated and redemption is holder-gated. The authority
//! cannot burn a holder's tokens, and a holder cannot mint.
//!
//! A [`Caller`] is an *authenticated* identity. There is no constructor
//! that takes a bare [`Identity`]: the caller either holds the keypair or
//! presents a valid signature over the request being submitted.

use super::error::{LedgerError, LedgerResult};
use super::reserve::Reserve;
use crate::crypto::keys::{Identity, Keypair, Signature};
use crate::crypto::signatures::verify;

/// An authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    identity: Identity,
}

impl Caller {
    /// Authenticate by possession of the keypair.
    pub fn from_keypair(keypair: &Keypair) -> Self {
        Self {
            identity: keypair.identity(),
        }
    }

    /// Authenticate a claimed identity by its signature over `payload`
    /// (a request's signing payload).
    pub fn from_signature(
        identity: Identity,
        payload: &[u8],
        signature: &Signature,
    ) -> LedgerResult<Self> {
        verify(&identity, payload, signature).map_err(|_| {
            LedgerError::Unauthorized(format!("bad signature for identity {identity}"))
        })?;
        Ok(Self { identity })
    }

    /// The authenticated identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Mint is reserved to the reserve authority.
pub fn authorize_mint(reserve: &Reserve, caller: &Caller) -> LedgerResult<()> {
    require_authority(reserve, caller, "mint")
}

/// Burn is reserved to the holder whose balance is debited.
pub fn authorize_burn(holder: &Identity, caller: &Caller) -> LedgerResult<()> {
    if caller.identity() == holder {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized(format!(
            "only holder {holder} may redeem its balance, caller is {}",
            caller.identity()
        )))
    }
}

/// Pause, unpause, and authority transfer are reserved to the authority.
pub fn authorize_admin(reserve: &Reserve, caller: &Caller) -> LedgerResult<()> {
    require_authority(reserve, caller, "administer the reserve")
}

fn require_authority(reserve: &Reserve, caller: &Caller, action: &str) -> LedgerResult<()> {
    if caller.identity() == &reserve.authority {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized(format!(
            "only the reserve authority may {action}, caller is {}",
            caller.identity()
        )))
    }
}
