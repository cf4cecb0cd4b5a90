//! RFC 6750 challenges produced on rejection
//!
//! Drives rejected requests through `guard` and renders the resulting
//! challenge as an HTTP response.

use bearer_gate::{
    Algorithm, AuthenticationGate, AuthorizationHeaderExtractor, BearerEntryPoint,
    ExtractorChain, GateError, KeySet, TokenPolicy, TokenSigner, VerificationKey,
};
use bearer_gate_test_utils::*;
use http::{header, StatusCode};
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn gate() -> Result<AuthenticationGate, anyhow::Error> {
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::HS256)
        .keys(KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)))
        .audience(TEST_AUDIENCE)
        .build()?;
    let extractors = ExtractorChain::new().with(AuthorizationHeaderExtractor::default());
    Ok(AuthenticationGate::new(policy, extractors)
        .with_entry_point(Arc::new(BearerEntryPoint::new(TEST_REALM))))
}

fn challenge_response(
    request: http::Request<()>,
) -> Result<http::Response<String>, anyhow::Error> {
    match gate()?.guard_at(&request, TEST_NOW) {
        Err(GateError::Challenge(challenge)) => Ok(challenge.to_response()),
        other => panic!("expected a challenge, got {other:?}"),
    }
}

fn body(response: &http::Response<String>) -> serde_json::Value {
    serde_json::from_str(response.body()).expect("challenge body is JSON")
}

// ============================================================================
// Challenges
// ============================================================================

#[test]
fn test_missing_token_challenge() -> Result<(), anyhow::Error> {
    let response = challenge_response(TestRequest::new().build())?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer realm=\"test-realm\""
    );
    assert_eq!(body(&response)["error"]["code"], "token_not_found");
    assert_eq!(body(&response)["error"]["message"], "Authentication required");
    Ok(())
}

#[test]
fn test_invalid_token_challenges_share_one_message() -> Result<(), anyhow::Error> {
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;
    let expired = TestTokenBuilder::new()
        .at(TEST_NOW)
        .with_audience(TEST_AUDIENCE)
        .expires_in(-3600)
        .sign(&signer);
    let wrong_audience = TestTokenBuilder::new()
        .at(TEST_NOW)
        .with_audience("someone-else")
        .sign(&signer);

    let cases = [
        ("only.two".to_string(), "malformed_structure"),
        (tamper_signature(&expired), "signature_invalid"),
        (expired, "token_expired"),
        (wrong_audience, "audience_mismatch"),
    ];

    for (token, code) in cases {
        let response = challenge_response(TestRequest::new().bearer(&token).build())?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"test-realm\", error=\"invalid_token\""
        );
        let body = body(&response);
        assert_eq!(body["error"]["code"], code);
        assert_eq!(body["error"]["message"], "The access token is invalid or expired");
    }
    Ok(())
}

#[test]
fn test_challenge_never_echoes_claims() -> Result<(), anyhow::Error> {
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;
    let token = TestTokenBuilder::new()
        .at(TEST_NOW)
        .for_user("secret-subject-value")
        .with_audience("unexpected-audience")
        .sign(&signer);

    let response = challenge_response(TestRequest::new().bearer(&token).build())?;

    assert!(!response.body().contains("secret-subject-value"));
    assert!(!response.body().contains("unexpected-audience"));
    Ok(())
}

#[test]
fn test_authenticated_request_has_no_challenge() -> Result<(), anyhow::Error> {
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;
    let token = TestTokenBuilder::new()
        .at(TEST_NOW)
        .with_audience(TEST_AUDIENCE)
        .sign(&signer);

    let identity = gate()?.guard_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)?;
    identity.assert_id("test-subject");
    Ok(())
}
