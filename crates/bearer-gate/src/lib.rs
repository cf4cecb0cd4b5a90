//! Bearer Gate: a standalone JWT authentication core.
//!
//! Turns an incoming request into an authenticated [`Identity`] or a
//! structured [`Rejection`] through a fixed pipeline:
//!
//! ```text
//! extractor -> codec -> verifier -> claims -> gate
//! ```
//!
//! Every stage is a pure function of its input plus the read-only
//! [`TokenPolicy`]. Nothing here performs I/O; key material is supplied by the
//! host application.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bearer_gate::{AuthenticationGate, GateConfig, KeySet, VerificationKey};
//!
//! let config = GateConfig::from_env()?;
//! let keys = KeySet::new().with_key(Some("key-2025-01"), VerificationKey::hmac(secret));
//! let gate = AuthenticationGate::from_config(&config, keys)?;
//!
//! match gate.guard(&request) {
//!     Ok(identity) => { /* identity.id(), identity.claims() */ }
//!     Err(GateError::Challenge(challenge)) => { /* respond 401 */ }
//!     Err(GateError::Rejected(rejection)) => { /* host-defined handling */ }
//! }
//! ```

#![warn(clippy::pedantic)]

/// Module for rejection taxonomy shared by all pipeline stages
pub mod error;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the request capability consumed by extractors
pub mod request;

/// Module for the raw token extracted from a request
pub mod token;

/// Module for token extractors and the ordered extractor chain
pub mod extractor;

/// Module for the compact JWT codec
pub mod codec;

/// Module for signing algorithms and key families
pub mod algorithm;

/// Module for verification key material and key sets
pub mod keys;

/// Module for signature verification
pub mod verifier;

/// Module for claim sets and claims validation
pub mod claims;

/// Module for authenticated identities
pub mod identity;

/// Module for the token policy and atomic policy replacement
pub mod policy;

/// Module for declarative gate configuration
pub mod config;

/// Module for token issuance (encode direction)
pub mod signer;

/// Module for entry points invoked on rejection
pub mod entry_point;

/// Module for the authentication gate
pub mod gate;

/// Module for metrics emitted by the gate
pub mod observability;

pub use algorithm::{Algorithm, KeyFamily};
pub use claims::ClaimSet;
pub use codec::{DecodedToken, JoseHeader, MAX_JWT_SIZE_BYTES};
pub use config::{ConfigError, GateConfig};
pub use entry_point::{BearerEntryPoint, Challenge, EntryPoint};
pub use error::{CodecError, Failure, NotFound};
pub use extractor::{
    AuthorizationHeaderExtractor, ExtractorChain, QueryParameterExtractor, TokenExtractor,
    TokenSource,
};
pub use gate::{
    AuthenticationGate, AuthenticationResult, GateError, Rejection, RejectionKind, Stage,
};
pub use identity::Identity;
pub use keys::{Jwk, JwkSet, KeyError, KeySet, VerificationKey};
pub use policy::{
    PolicyError, PolicyStore, TokenPolicy, TokenPolicyBuilder, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW,
};
pub use request::RequestParts;
pub use signer::{SignError, TokenSigner};
pub use token::RawToken;
