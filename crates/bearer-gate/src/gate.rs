//! The authentication gate.
//!
//! Drives a linear pipeline per request:
//!
//! ```text
//! Extracting -> Decoding -> VerifyingSignature -> ValidatingClaims -> Authenticated
//!      \____________\______________\___________________\_____________> Rejected
//! ```
//!
//! The first failing stage ends the run with a [`Rejection`] carrying that
//! stage and the failure kind. Nothing is retried: authentication failures
//! are not transient.
//!
//! # Rejection handling
//!
//! [`AuthenticationGate::authenticate`] only runs the pipeline.
//! [`AuthenticationGate::guard`] also applies the configured rejection
//! handling:
//!
//! - `throw_exceptions = false` (default): the rejection goes to the entry
//!   point, and the caller receives [`GateError::Challenge`]. Without an
//!   entry point the caller receives [`GateError::Rejected`].
//! - `throw_exceptions = true`: the entry point is never consulted and the
//!   caller receives [`GateError::Rejected`] to handle as it sees fit.

use crate::claims::{self, ClaimSet};
use crate::codec::DecodedToken;
use crate::config::{ConfigError, GateConfig};
use crate::entry_point::{BearerEntryPoint, Challenge, EntryPoint};
use crate::error::{CodecError, Failure, NotFound};
use crate::extractor::ExtractorChain;
use crate::identity::Identity;
use crate::keys::KeySet;
use crate::observability::metrics::{record_authentication, STATUS_REJECTED, STATUS_SUCCESS};
use crate::policy::{PolicyStore, TokenPolicy};
use crate::request::RequestParts;
use crate::token::RawToken;
use crate::verifier;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Looking for a token in the request.
    Extracting,
    /// Decoding the compact representation.
    Decoding,
    /// Checking algorithm, key and signature.
    VerifyingSignature,
    /// Checking claims against policy and time.
    ValidatingClaims,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extracting => "extracting",
            Stage::Decoding => "decoding",
            Stage::VerifyingSignature => "verifying_signature",
            Stage::ValidatingClaims => "validating_claims",
        };
        f.write_str(name)
    }
}

/// What went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    /// No token in the request.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Token could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Signature or claims were rejected.
    #[error(transparent)]
    Failure(#[from] Failure),
}

impl RejectionKind {
    /// Stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RejectionKind::NotFound(e) => e.code(),
            RejectionKind::Codec(e) => e.code(),
            RejectionKind::Failure(e) => e.code(),
        }
    }
}

/// Terminal failure of a pipeline run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Authentication rejected while {stage}: {kind}")]
pub struct Rejection {
    stage: Stage,
    kind: RejectionKind,
}

impl Rejection {
    /// Rejection at `stage`.
    pub fn new(stage: Stage, kind: impl Into<RejectionKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    /// Stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Failure kind.
    #[must_use]
    pub fn kind(&self) -> &RejectionKind {
        &self.kind
    }

    /// Stable reason code of the kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether the request carried no token at all.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, RejectionKind::NotFound(_))
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationResult {
    /// The request carries a valid token.
    Authenticated(Identity),
    /// The request was rejected.
    Rejected(Rejection),
}

impl AuthenticationResult {
    /// Whether the request was authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationResult::Authenticated(_))
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the rejection for a rejected run.
    pub fn into_result(self) -> Result<Identity, Rejection> {
        match self {
            AuthenticationResult::Authenticated(identity) => Ok(identity),
            AuthenticationResult::Rejected(rejection) => Err(rejection),
        }
    }
}

impl From<Result<Identity, Rejection>> for AuthenticationResult {
    fn from(result: Result<Identity, Rejection>) -> Self {
        match result {
            Ok(identity) => AuthenticationResult::Authenticated(identity),
            Err(rejection) => AuthenticationResult::Rejected(rejection),
        }
    }
}

/// Error returned by [`AuthenticationGate::guard`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The entry point produced a challenge to send to the client.
    #[error("Authentication required")]
    Challenge(Challenge),

    /// The rejection is handed back to the host.
    #[error(transparent)]
    Rejected(Rejection),
}

/// Turns requests into identities under a token policy.
///
/// `Send + Sync`; share one gate across all request handlers.
pub struct AuthenticationGate {
    policy: Arc<PolicyStore>,
    extractors: ExtractorChain,
    entry_point: Option<Arc<dyn EntryPoint>>,
    throw_exceptions: bool,
}

impl AuthenticationGate {
    /// Gate with a fixed policy and no entry point.
    #[must_use]
    pub fn new(policy: TokenPolicy, extractors: ExtractorChain) -> Self {
        Self::with_policy_store(Arc::new(PolicyStore::new(policy)), extractors)
    }

    /// Gate reading its policy from a shared store, for key rotation.
    #[must_use]
    pub fn with_policy_store(policy: Arc<PolicyStore>, extractors: ExtractorChain) -> Self {
        Self {
            policy,
            extractors,
            entry_point: None,
            throw_exceptions: false,
        }
    }

    /// Set the entry point consulted on rejection.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: Arc<dyn EntryPoint>) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    /// Return rejections to the host instead of consulting the entry point.
    #[must_use]
    pub fn with_throw_exceptions(mut self, throw_exceptions: bool) -> Self {
        self.throw_exceptions = throw_exceptions;
        self
    }

    /// Assemble a gate from configuration.
    ///
    /// Registers the header extractor (if enabled) before the query
    /// parameter extractor (if enabled), and creates a [`BearerEntryPoint`]
    /// when `create_entry_point` is set.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from building the policy.
    pub fn from_config(config: &GateConfig, keys: KeySet) -> Result<Self, ConfigError> {
        Self::from_config_with_entry_point(config, keys, None)
    }

    /// Like [`AuthenticationGate::from_config`], with a host default entry
    /// point used when `create_entry_point` is not set.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from building the policy.
    pub fn from_config_with_entry_point(
        config: &GateConfig,
        keys: KeySet,
        default_entry_point: Option<Arc<dyn EntryPoint>>,
    ) -> Result<Self, ConfigError> {
        let policy = config.policy(keys)?;
        let entry_point: Option<Arc<dyn EntryPoint>> = if config.create_entry_point {
            Some(Arc::new(BearerEntryPoint::new(config.realm.clone())))
        } else {
            default_entry_point
        };

        let extractors = config.extractor_chain();
        tracing::info!(
            target: "bearer_gate.gate",
            extractors = extractors.len(),
            algorithms = ?policy.algorithms(),
            keys = policy.keys().len(),
            entry_point = entry_point.is_some(),
            throw_exceptions = config.throw_exceptions,
            "Authentication gate configured"
        );

        Ok(Self {
            policy: Arc::new(PolicyStore::new(policy)),
            extractors,
            entry_point,
            throw_exceptions: config.throw_exceptions,
        })
    }

    /// Shared policy store; `replace` on it rotates keys for this gate.
    #[must_use]
    pub fn policy_store(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    /// Whether rejections bypass the entry point.
    #[must_use]
    pub fn throw_exceptions(&self) -> bool {
        self.throw_exceptions
    }

    /// Run the pipeline for `request` at the current time.
    #[instrument(skip_all)]
    pub fn authenticate(&self, request: &dyn RequestParts) -> AuthenticationResult {
        self.authenticate_at(request, chrono::Utc::now().timestamp())
    }

    /// Run the pipeline for `request` at `now` (Unix seconds).
    pub fn authenticate_at(&self, request: &dyn RequestParts, now: i64) -> AuthenticationResult {
        let start = Instant::now();
        let result = self
            .extractors
            .extract(request)
            .map_err(|e| Rejection::new(Stage::Extracting, e))
            .and_then(|token| self.run(&token, now));
        Self::record(&result, start);
        result.into()
    }

    /// Run the pipeline for an already extracted token at `now`.
    pub fn authenticate_token(&self, token: &RawToken, now: i64) -> AuthenticationResult {
        let start = Instant::now();
        let result = self.run(token, now);
        Self::record(&result, start);
        result.into()
    }

    /// Run the pipeline and apply rejection handling.
    ///
    /// # Errors
    ///
    /// [`GateError::Challenge`] or [`GateError::Rejected`]; see the module
    /// documentation.
    #[instrument(skip_all)]
    pub fn guard(&self, request: &dyn RequestParts) -> Result<Identity, GateError> {
        self.guard_at(request, chrono::Utc::now().timestamp())
    }

    /// [`AuthenticationGate::guard`] at `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// See [`AuthenticationGate::guard`].
    pub fn guard_at(&self, request: &dyn RequestParts, now: i64) -> Result<Identity, GateError> {
        self.authenticate_at(request, now)
            .into_result()
            .map_err(|rejection| self.handle_rejection(rejection))
    }

    /// Challenge the configured entry point would produce, if any.
    #[must_use]
    pub fn challenge_for(&self, rejection: &Rejection) -> Option<Challenge> {
        self.entry_point
            .as_ref()
            .map(|entry_point| entry_point.challenge(rejection))
    }

    fn handle_rejection(&self, rejection: Rejection) -> GateError {
        if self.throw_exceptions {
            return GateError::Rejected(rejection);
        }
        match self.challenge_for(&rejection) {
            Some(challenge) => GateError::Challenge(challenge),
            None => GateError::Rejected(rejection),
        }
    }

    fn run(&self, token: &RawToken, now: i64) -> Result<Identity, Rejection> {
        // One snapshot per run; a concurrent replace never splits a run
        let policy = self.policy.load();

        let decoded =
            DecodedToken::decode(token).map_err(|e| Rejection::new(Stage::Decoding, e))?;

        verifier::verify(&decoded, &policy)
            .map_err(|e| Rejection::new(Stage::VerifyingSignature, e))?;

        let claims = ClaimSet::from(decoded.into_claims());
        claims::validate_at(&claims, &policy, now)
            .map_err(|e| Rejection::new(Stage::ValidatingClaims, e))?;

        Identity::from_claims(claims, policy.identity_claim())
            .map_err(|e| Rejection::new(Stage::ValidatingClaims, e))
    }

    fn record(result: &Result<Identity, Rejection>, start: Instant) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::debug!(target: "bearer_gate.gate", "Request authenticated");
                record_authentication(STATUS_SUCCESS, "none", duration);
            }
            Err(rejection) => {
                tracing::debug!(
                    target: "bearer_gate.gate",
                    stage = %rejection.stage(),
                    reason = rejection.code(),
                    "Request rejected"
                );
                record_authentication(STATUS_REJECTED, rejection.code(), duration);
            }
        }
    }
}

impl fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("policy", &self.policy)
            .field("extractors", &self.extractors)
            .field("entry_point", &self.entry_point.is_some())
            .field("throw_exceptions", &self.throw_exceptions)
            .finish()
    }
}
