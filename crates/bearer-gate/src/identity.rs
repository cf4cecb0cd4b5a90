//! Authenticated identity produced by the gate.

use crate::claims::ClaimSet;
use crate::error::Failure;
use serde_json::Value;
use std::fmt;

/// Subject of a successfully authenticated request.
///
/// The id comes from the policy's identity claim (`sub` by default). It is a
/// user or client identifier, so `Debug` redacts it.
#[derive(Clone, PartialEq)]
pub struct Identity {
    id: String,
    claims: ClaimSet,
}

impl Identity {
    /// Build an identity from validated claims.
    ///
    /// The identity claim may be a string or an integer; integers are
    /// rendered in decimal.
    ///
    /// # Errors
    ///
    /// - [`Failure::MissingClaim`] when the claim is absent
    /// - [`Failure::InvalidClaim`] when it is empty or another JSON type
    pub fn from_claims(claims: ClaimSet, identity_claim: &str) -> Result<Self, Failure> {
        let id = match claims.get(identity_claim) {
            None => return Err(Failure::MissingClaim(identity_claim.to_string())),
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(number)) if number.is_i64() || number.is_u64() => number.to_string(),
            Some(_) => return Err(Failure::InvalidClaim(identity_claim.to_string())),
        };
        Ok(Self { id, claims })
    }

    /// Identity id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All claims of the token.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Consume into the claims.
    #[must_use]
    pub fn into_claims(self) -> ClaimSet {
        self.claims
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}
