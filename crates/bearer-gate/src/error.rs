//! Rejection taxonomy for the authentication pipeline.
//!
//! Each stage owns one error type:
//!
//! - extraction: [`NotFound`]
//! - decoding: [`CodecError`]
//! - signature verification and claims validation: [`Failure`]
//!
//! All of them are recoverable, caller-visible outcomes. Display strings never
//! contain key material, signatures or token contents. Each type exposes a
//! stable `code()` used for logs and metrics labels.

use thiserror::Error;

/// No extractor found a bearer token in the request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No bearer token found in request")]
pub struct NotFound;

impl NotFound {
    /// Stable reason code.
    #[must_use]
    pub fn code(self) -> &'static str {
        "token_not_found"
    }
}

/// Errors produced while decoding the compact JWT representation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Token size exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("Token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token does not have exactly three dot-separated segments.
    #[error("Token is not a well-formed JWT")]
    MalformedStructure,

    /// A segment is not valid base64url.
    #[error("Token segment is not valid base64url")]
    InvalidEncoding,

    /// Header or payload is not a JSON object, or a header field has the wrong type.
    #[error("Token header or payload is not a valid JSON object")]
    InvalidPayload,
}

impl CodecError {
    /// Stable reason code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            CodecError::TokenTooLarge => "token_too_large",
            CodecError::MalformedStructure => "malformed_structure",
            CodecError::InvalidEncoding => "invalid_encoding",
            CodecError::InvalidPayload => "invalid_payload",
        }
    }
}

/// Signature verification and claims validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Header algorithm is missing, unknown, or not in the policy allow-list.
    #[error("Token algorithm is not allowed")]
    AlgorithmNotAllowed,

    /// No configured key matches the token's key id and algorithm.
    #[error("No matching verification key")]
    UnknownKey,

    /// Signature does not match the signed content.
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// `exp` is in the past beyond the clock skew tolerance.
    #[error("Token has expired")]
    Expired,

    /// `nbf` is in the future beyond the clock skew tolerance.
    #[error("Token is not yet valid")]
    NotYetValid,

    /// `iat` is in the future beyond the clock skew tolerance.
    #[error("Token was issued in the future")]
    IssuedInFuture,

    /// `iss` does not match the expected issuer.
    #[error("Token issuer does not match")]
    IssuerMismatch,

    /// Expected audience is not present in `aud`.
    #[error("Token audience does not match")]
    AudienceMismatch,

    /// A required claim is absent.
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// A claim is present but has the wrong JSON type.
    #[error("Invalid claim: {0}")]
    InvalidClaim(String),
}

impl Failure {
    /// Stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Failure::AlgorithmNotAllowed => "algorithm_not_allowed",
            Failure::UnknownKey => "unknown_key",
            Failure::SignatureInvalid => "signature_invalid",
            Failure::Expired => "token_expired",
            Failure::NotYetValid => "token_not_yet_valid",
            Failure::IssuedInFuture => "issued_in_future",
            Failure::IssuerMismatch => "issuer_mismatch",
            Failure::AudienceMismatch => "audience_mismatch",
            Failure::MissingClaim(_) => "missing_claim",
            Failure::InvalidClaim(_) => "invalid_claim",
        }
    }
}
