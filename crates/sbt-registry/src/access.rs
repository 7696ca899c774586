//! Access control for the single authorized issuer.
//!
//! The guard is a plain capability check. It holds no lock of its own; the
//! registry keeps it inside the same exclusive section as the state it
//! protects, so a check and the mutation it allows are never separated by a
//! transfer.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::identity::PrincipalId;

/// Holds the identity allowed to mutate registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerGuard {
    issuer: PrincipalId,
}

impl IssuerGuard {
    pub fn new(issuer: PrincipalId) -> Self {
        Self { issuer }
    }

    /// The current issuer.
    pub fn issuer(&self) -> &PrincipalId {
        &self.issuer
    }

    /// Check that `caller` is the current issuer.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` for any other caller.
    pub fn authorize(&self, caller: &PrincipalId) -> Result<()> {
        if caller != &self.issuer {
            return Err(RegistryError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    /// Hand the issuer role to `new_issuer`, returning the previous issuer.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` unless `caller` is the current
    /// issuer.
    pub fn transfer(
        &mut self,
        caller: &PrincipalId,
        new_issuer: PrincipalId,
    ) -> Result<PrincipalId> {
        self.authorize(caller)?;
        Ok(std::mem::replace(&mut self.issuer, new_issuer))
    }
}
