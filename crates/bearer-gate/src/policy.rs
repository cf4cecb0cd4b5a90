//! Token policy and atomic policy replacement.
//!
//! A [`TokenPolicy`] is built once through a validating builder and never
//! mutated afterwards. Key rotation replaces the whole policy through a
//! [`PolicyStore`]; each pipeline run loads one snapshot and uses it for
//! every stage, so a run never observes a half-updated policy.

use crate::algorithm::Algorithm;
use crate::keys::{KeyError, KeySet};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default clock skew tolerance (5 minutes).
///
/// Accounts for clock drift between the token issuer and this host.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Larger values would keep expired tokens usable for too long.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Default claim carrying the identity id.
pub const DEFAULT_IDENTITY_CLAIM: &str = "sub";

/// Errors building a [`TokenPolicy`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The algorithm allow-list is empty.
    #[error("At least one algorithm must be allowed")]
    NoAlgorithms,

    /// No verification keys were supplied.
    #[error("At least one verification key is required")]
    NoKeys,

    /// A verification key is unusable.
    #[error("Invalid verification key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Clock skew exceeds [`MAX_CLOCK_SKEW`].
    #[error("Clock skew must not exceed {max} seconds, got {actual}")]
    InvalidClockSkew {
        /// Maximum in seconds.
        max: u64,
        /// Requested skew in seconds.
        actual: u64,
    },

    /// The identity claim name is empty.
    #[error("Identity claim must not be empty")]
    InvalidIdentityClaim,
}

/// Immutable verification and validation policy.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    algorithms: Vec<Algorithm>,
    keys: KeySet,
    issuer: Option<String>,
    audience: Option<String>,
    clock_skew: Duration,
    required_claims: Vec<String>,
    identity_claim: String,
}

impl TokenPolicy {
    /// Start building a policy.
    #[must_use]
    pub fn builder() -> TokenPolicyBuilder {
        TokenPolicyBuilder::default()
    }

    /// Allowed algorithms.
    #[must_use]
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Whether `alg` is in the allow-list.
    #[must_use]
    pub fn allows(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }

    /// Verification keys.
    #[must_use]
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Expected `iss`, if any.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Expected `aud` member, if any.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Clock skew tolerance applied to `exp`, `nbf` and `iat`.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Claims that must be present, including the identity claim.
    #[must_use]
    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    /// Claim the identity id is read from.
    #[must_use]
    pub fn identity_claim(&self) -> &str {
        &self.identity_claim
    }
}

/// Builder for [`TokenPolicy`].
#[derive(Debug, Clone)]
pub struct TokenPolicyBuilder {
    algorithms: Vec<Algorithm>,
    keys: KeySet,
    issuer: Option<String>,
    audience: Option<String>,
    clock_skew: Duration,
    required_claims: Vec<String>,
    identity_claim: String,
}

impl Default for TokenPolicyBuilder {
    fn default() -> Self {
        Self {
            algorithms: Vec::new(),
            keys: KeySet::new(),
            issuer: None,
            audience: None,
            clock_skew: DEFAULT_CLOCK_SKEW,
            required_claims: Vec::new(),
            identity_claim: DEFAULT_IDENTITY_CLAIM.to_string(),
        }
    }
}

impl TokenPolicyBuilder {
    /// Allow one more algorithm.
    #[must_use]
    pub fn algorithm(mut self, alg: Algorithm) -> Self {
        if !self.algorithms.contains(&alg) {
            self.algorithms.push(alg);
        }
        self
    }

    /// Allow several algorithms.
    #[must_use]
    pub fn algorithms(self, algs: impl IntoIterator<Item = Algorithm>) -> Self {
        algs.into_iter().fold(self, Self::algorithm)
    }

    /// Verification keys.
    #[must_use]
    pub fn keys(mut self, keys: KeySet) -> Self {
        self.keys = keys;
        self
    }

    /// Expected issuer.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Expected audience.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Clock skew tolerance. At most [`MAX_CLOCK_SKEW`].
    #[must_use]
    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Require one more claim.
    #[must_use]
    pub fn required_claim(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required_claims.contains(&name) {
            self.required_claims.push(name);
        }
        self
    }

    /// Require several claims.
    #[must_use]
    pub fn required_claims<S: Into<String>>(self, names: impl IntoIterator<Item = S>) -> Self {
        names
            .into_iter()
            .fold(self, |builder, name| builder.required_claim(name))
    }

    /// Claim the identity id is read from.
    #[must_use]
    pub fn identity_claim(mut self, name: impl Into<String>) -> Self {
        self.identity_claim = name.into();
        self
    }

    /// Validate and build the policy.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::NoAlgorithms`] for an empty allow-list
    /// - [`PolicyError::NoKeys`] for an empty key set
    /// - [`PolicyError::InvalidKey`] for unusable key material, such as an
    ///   empty HMAC secret
    /// - [`PolicyError::InvalidClockSkew`] above [`MAX_CLOCK_SKEW`]
    /// - [`PolicyError::InvalidIdentityClaim`] for an empty identity claim
    pub fn build(self) -> Result<TokenPolicy, PolicyError> {
        if self.algorithms.is_empty() {
            return Err(PolicyError::NoAlgorithms);
        }
        if self.keys.is_empty() {
            return Err(PolicyError::NoKeys);
        }
        self.keys.validate()?;
        if self.clock_skew > MAX_CLOCK_SKEW {
            return Err(PolicyError::InvalidClockSkew {
                max: MAX_CLOCK_SKEW.as_secs(),
                actual: self.clock_skew.as_secs(),
            });
        }
        if self.identity_claim.trim().is_empty() {
            return Err(PolicyError::InvalidIdentityClaim);
        }

        for alg in &self.algorithms {
            if !self.keys.supports(*alg) {
                tracing::warn!(
                    target: "bearer_gate.policy",
                    alg = %alg,
                    "Allowed algorithm has no compatible key; tokens using it will be rejected"
                );
            }
        }

        let mut required_claims = self.required_claims;
        if !required_claims.contains(&self.identity_claim) {
            required_claims.push(self.identity_claim.clone());
        }

        Ok(TokenPolicy {
            algorithms: self.algorithms,
            keys: self.keys,
            issuer: self.issuer,
            audience: self.audience,
            clock_skew: self.clock_skew,
            required_claims,
            identity_claim: self.identity_claim,
        })
    }
}

/// Shared handle for swapping the active policy at runtime.
///
/// Readers never block; `replace` publishes a whole new policy atomically.
pub struct PolicyStore {
    current: ArcSwap<TokenPolicy>,
}

impl PolicyStore {
    /// Store holding `policy`.
    #[must_use]
    pub fn new(policy: TokenPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
        }
    }

    /// Snapshot of the active policy.
    #[must_use]
    pub fn load(&self) -> Arc<TokenPolicy> {
        self.current.load_full()
    }

    /// Publish a new policy, returning the one it replaced.
    pub fn replace(&self, policy: TokenPolicy) -> Arc<TokenPolicy> {
        let previous = self.current.swap(Arc::new(policy));
        tracing::info!(
            target: "bearer_gate.policy",
            "Token policy replaced"
        );
        previous
    }
}

impl fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyStore")
            .field("current", &*self.current.load())
            .finish()
    }
}
