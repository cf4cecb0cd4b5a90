//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating test claims and hand-crafted tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bearer_gate::{ClaimSet, TokenSigner};
use chrono::Utc;
use serde_json::Value;

/// Builder for creating test JWT claims
///
/// Times are relative to an anchor, which defaults to the current time and
/// can be pinned with [`TestTokenBuilder::at`].
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_scope("documents:read")
///     .expires_in(3600)
///     .sign(&signer);
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    now: i64,
    claims: ClaimSet,
    exp_offset: Option<i64>,
    nbf_offset: Option<i64>,
    iat_offset: Option<i64>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults: `sub`, `iat` now, `exp` in an hour.
    pub fn new() -> Self {
        Self {
            now: Utc::now().timestamp(),
            claims: ClaimSet::new().with("sub", "test-subject"),
            exp_offset: Some(3600),
            nbf_offset: None,
            iat_offset: Some(0),
        }
    }

    /// Anchor relative times at `now` (Unix seconds).
    pub fn at(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", subject)
    }

    /// Set the scope (space-separated)
    pub fn with_scope(self, scope: &str) -> Self {
        self.with_claim("scope", scope)
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", issuer)
    }

    /// Set a single audience string
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", audience)
    }

    /// Set an audience array
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", audiences.to_vec())
    }

    /// Set expiration in seconds from the anchor (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp_offset = Some(seconds);
        self
    }

    /// Set not-before in seconds from the anchor
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf_offset = Some(seconds);
        self
    }

    /// Set issued-at in seconds from the anchor
    pub fn issued_in(mut self, seconds: i64) -> Self {
        self.iat_offset = Some(seconds);
        self
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name, value);
        self
    }

    /// Leave a claim out of the token, including the time claims
    pub fn without(mut self, name: &str) -> Self {
        match name {
            "exp" => self.exp_offset = None,
            "nbf" => self.nbf_offset = None,
            "iat" => self.iat_offset = None,
            _ => {
                let mut map = self.claims.into_map();
                map.remove(name);
                self.claims = ClaimSet::from(map);
            }
        }
        self
    }

    /// Build the claim set
    pub fn build(self) -> ClaimSet {
        let mut claims = self.claims;
        for (name, offset) in [
            ("exp", self.exp_offset),
            ("nbf", self.nbf_offset),
            ("iat", self.iat_offset),
        ] {
            if let Some(offset) = offset {
                claims.insert(name, self.now + offset);
            }
        }
        claims
    }

    /// Build and sign with `signer`
    pub fn sign(self, signer: &TokenSigner) -> String {
        signer
            .sign(&self.build())
            .expect("test token signing should succeed")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a token from raw header and claims JSON with an arbitrary signature.
///
/// Used to craft tokens a real signer would refuse to produce, such as
/// `alg: none`.
pub fn encode_unsigned(header: &Value, claims: &Value, signature: &[u8]) -> String {
    let header = serde_json::to_vec(header).expect("header should serialize");
    let claims = serde_json::to_vec(claims).expect("claims should serialize");
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims),
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Flip one bit of the signature segment.
pub fn tamper_signature(token: &str) -> String {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .expect("token should have a signature segment");
    let mut signature = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature should be base64url");
    if let Some(first) = signature.first_mut() {
        *first ^= 0x01;
    }
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// Replace the payload segment while keeping the original signature.
pub fn swap_payload(token: &str, claims: &Value) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token should have three segments");
    let payload = serde_json::to_vec(claims).expect("claims should serialize");
    format!(
        "{}.{}.{}",
        parts[0],
        URL_SAFE_NO_PAD.encode(payload),
        parts[2]
    )
}
