//! Claim sets and claims validation.
//!
//! Validation short-circuits on the first failure, in a fixed order:
//! required claims, `exp`, `nbf`, `iat`, `iss`, `aud`. Every time check
//! applies the policy's clock skew tolerance. Time claims are `NumericDate`
//! values; a fractional part is truncated.

use crate::error::Failure;
use crate::policy::TokenPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Payload claims of a verified token.
///
/// `Debug` lists claim names only, never values.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a claim, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a claim, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Raw claim value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether a claim is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Claim value if it is a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// `aud` values, whether written as a string or an array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::InvalidClaim`] when `aud` has any other shape.
    pub fn audiences(&self) -> Result<Vec<&str>, Failure> {
        match self.0.get("aud") {
            None => Ok(Vec::new()),
            Some(Value::String(aud)) => Ok(vec![aud.as_str()]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| value.as_str().ok_or_else(|| invalid("aud")))
                .collect(),
            Some(_) => Err(invalid("aud")),
        }
    }

    /// Space-separated scopes from the `scope` claim.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.get_str("scope").unwrap_or_default().split_whitespace()
    }

    /// Check if the token has a specific scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }

    /// `NumericDate` claim in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::InvalidClaim`] when the claim is present but not a
    /// number.
    pub fn numeric_date(&self, name: &str) -> Result<Option<i64>, Failure> {
        match self.0.get(name) {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(truncate_seconds))
                .map(Some)
                .ok_or_else(|| invalid(name)),
            Some(_) => Err(invalid(name)),
        }
    }

    /// Claim names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("names", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_seconds(value: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so compare with `<`
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

fn invalid(name: &str) -> Failure {
    Failure::InvalidClaim(name.to_string())
}

/// Validate claims against the policy at the current time.
///
/// # Errors
///
/// See [`validate_at`].
pub fn validate(claims: &ClaimSet, policy: &TokenPolicy) -> Result<(), Failure> {
    validate_at(claims, policy, chrono::Utc::now().timestamp())
}

/// Validate claims against the policy at `now` (Unix seconds).
///
/// Separated from [`validate`] so tests can use a fixed clock.
///
/// # Errors
///
/// The first of, in order: [`Failure::MissingClaim`], [`Failure::Expired`],
/// [`Failure::NotYetValid`], [`Failure::IssuedInFuture`],
/// [`Failure::IssuerMismatch`], [`Failure::AudienceMismatch`].
/// [`Failure::InvalidClaim`] is returned by whichever check meets a claim of
/// the wrong type.
pub fn validate_at(claims: &ClaimSet, policy: &TokenPolicy, now: i64) -> Result<(), Failure> {
    let skew = i64::try_from(policy.clock_skew().as_secs()).unwrap_or(i64::MAX);

    for name in policy.required_claims() {
        if !claims.contains(name) {
            tracing::debug!(
                target: "bearer_gate.claims",
                claim = %name,
                "Token rejected: required claim missing"
            );
            return Err(Failure::MissingClaim(name.clone()));
        }
    }

    if let Some(exp) = claims.numeric_date("exp")? {
        if now > exp.saturating_add(skew) {
            tracing::debug!(
                target: "bearer_gate.claims",
                exp,
                now,
                skew,
                "Token rejected: expired"
            );
            return Err(Failure::Expired);
        }
    }

    if let Some(nbf) = claims.numeric_date("nbf")? {
        if now < nbf.saturating_sub(skew) {
            tracing::debug!(
                target: "bearer_gate.claims",
                nbf,
                now,
                skew,
                "Token rejected: not yet valid"
            );
            return Err(Failure::NotYetValid);
        }
    }

    if let Some(iat) = claims.numeric_date("iat")? {
        if iat > now.saturating_add(skew) {
            tracing::debug!(
                target: "bearer_gate.claims",
                iat,
                now,
                skew,
                "Token rejected: iat too far in future"
            );
            return Err(Failure::IssuedInFuture);
        }
    }

    if let Some(expected) = policy.issuer() {
        let issuer = match claims.get("iss") {
            None => None,
            Some(Value::String(iss)) => Some(iss.as_str()),
            Some(_) => return Err(invalid("iss")),
        };
        if issuer != Some(expected) {
            tracing::debug!(
                target: "bearer_gate.claims",
                "Token rejected: issuer mismatch"
            );
            return Err(Failure::IssuerMismatch);
        }
    }

    if let Some(expected) = policy.audience() {
        if !claims.audiences()?.contains(&expected) {
            tracing::debug!(
                target: "bearer_gate.claims",
                "Token rejected: audience mismatch"
            );
            return Err(Failure::AudienceMismatch);
        }
    }

    Ok(())
}
