//! End-to-end pipeline tests
//!
//! Each test drives a request through extraction, decoding, signature
//! verification and claims validation, and checks the terminal outcome and
//! the stage that produced it.

use bearer_gate::{
    Algorithm, AuthenticationGate, AuthorizationHeaderExtractor, DecodedToken, ExtractorChain,
    GateConfig, KeySet, QueryParameterExtractor, Stage, TokenExtractor, TokenPolicy, TokenSigner,
    VerificationKey,
};
use bearer_gate_test_utils::*;
use serde_json::json;

// ============================================================================
// Helper Functions
// ============================================================================

fn ed25519_gate() -> Result<(AuthenticationGate, TokenSigner), anyhow::Error> {
    let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::EdDSA)
        .keys(KeySet::new().with_key(Some(TEST_KEY_ID_1), key.verification_key()?))
        .issuer(TEST_ISSUER)
        .audience(TEST_AUDIENCE)
        .build()?;
    let gate = AuthenticationGate::new(
        policy,
        ExtractorChain::new().with(AuthorizationHeaderExtractor::default()),
    );
    Ok((gate, key.signer()?))
}

fn valid_claims() -> TestTokenBuilder {
    TestTokenBuilder::new()
        .at(TEST_NOW)
        .for_user(TEST_SUBJECT)
        .with_issuer(TEST_ISSUER)
        .with_audience(TEST_AUDIENCE)
}

// ============================================================================
// Authenticated paths
// ============================================================================

#[test]
fn test_valid_token_is_authenticated() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().with_scope("documents:read documents:write").sign(&signer);

    let result = gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW);

    result
        .assert_authenticated()
        .assert_id(TEST_SUBJECT)
        .assert_has_scope(SCOPE_READ)
        .assert_has_scope(SCOPE_WRITE)
        .assert_claim_str("iss", TEST_ISSUER);
    Ok(())
}

#[test]
fn test_valid_token_is_authenticated_at_current_time() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = TestTokenBuilder::new()
        .for_user(TEST_SUBJECT_BOB)
        .with_issuer(TEST_ISSUER)
        .with_audiences(&["other-service", TEST_AUDIENCE])
        .sign(&signer);

    let result = gate.authenticate(&TestRequest::new().bearer(&token).build());

    result.assert_authenticated().assert_id(TEST_SUBJECT_BOB);
    Ok(())
}

#[test]
fn test_numeric_subject_becomes_identity_id() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().with_claim("sub", 4242).sign(&signer);

    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_authenticated()
        .assert_id("4242");
    Ok(())
}

#[test]
fn test_custom_identity_claim() -> Result<(), anyhow::Error> {
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::HS256)
        .keys(KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)))
        .identity_claim("email")
        .build()?;
    let gate = AuthenticationGate::new(
        policy,
        ExtractorChain::new().with(AuthorizationHeaderExtractor::default()),
    );
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;

    let with_email = valid_claims().with_claim("email", "alice@example.test").sign(&signer);
    gate.authenticate_at(&TestRequest::new().bearer(&with_email).build(), TEST_NOW)
        .assert_authenticated()
        .assert_id("alice@example.test");

    let without_email = valid_claims().sign(&signer);
    gate.authenticate_at(&TestRequest::new().bearer(&without_email).build(), TEST_NOW)
        .assert_rejected_at(Stage::ValidatingClaims, "missing_claim");
    Ok(())
}

// ============================================================================
// Extraction scenarios
// ============================================================================

#[test]
fn test_bearer_header_yields_raw_token() {
    let request = TestRequest::new()
        .header("Authorization", "Bearer abc.def.ghi")
        .build();

    let token = AuthorizationHeaderExtractor::default()
        .extract(&request)
        .expect("token should be extracted");

    assert_eq!(token.as_str(), "abc.def.ghi");
}

#[test]
fn test_wrong_prefix_is_not_found() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    let request = TestRequest::new()
        .header("Authorization", "Token abc.def.ghi")
        .build();

    let rejection = gate
        .authenticate_at(&request, TEST_NOW)
        .assert_rejected_at(Stage::Extracting, "token_not_found")
        .clone();

    assert!(rejection.is_not_found());
    Ok(())
}

#[test]
fn test_query_parameter_scenario() {
    let mut config = GateConfig::default();
    config.authorization_header.enabled = false;
    config.query_parameter.enabled = true;

    let request = TestRequest::new()
        .header("Authorization", "Bearer from-header")
        .query("bearer", "xyz")
        .build();

    let token = config.extractor_chain().extract(&request).unwrap();
    assert_eq!(token.as_str(), "xyz");
}

#[test]
fn test_query_parameter_token_authenticates() -> Result<(), anyhow::Error> {
    let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::EdDSA)
        .keys(KeySet::new().with_key(Some(TEST_KEY_ID_1), key.verification_key()?))
        .build()?;
    let gate = AuthenticationGate::new(
        policy,
        ExtractorChain::new()
            .with(AuthorizationHeaderExtractor::default())
            .with(QueryParameterExtractor::new("access_token")),
    );
    let token = valid_claims().sign(&key.signer()?);

    let request = TestRequest::new().query("access_token", &token).build();
    gate.authenticate_at(&request, TEST_NOW)
        .assert_authenticated()
        .assert_id(TEST_SUBJECT);
    Ok(())
}

#[test]
fn test_no_token_at_all_is_not_found() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    gate.authenticate_at(&TestRequest::new().build(), TEST_NOW)
        .assert_rejected_at(Stage::Extracting, "token_not_found");
    Ok(())
}

// ============================================================================
// Decoding scenarios
// ============================================================================

#[test]
fn test_only_two_segments_is_malformed() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    gate.authenticate_at(&TestRequest::new().bearer("only.two").build(), TEST_NOW)
        .assert_rejected_at(Stage::Decoding, "malformed_structure");
    Ok(())
}

#[test]
fn test_bad_base64_is_invalid_encoding() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    gate.authenticate_at(&TestRequest::new().bearer("a*b.c.d").build(), TEST_NOW)
        .assert_rejected_at(Stage::Decoding, "invalid_encoding");
    Ok(())
}

#[test]
fn test_non_object_payload_is_invalid_payload() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    let token = encode_unsigned(&json!({"alg": "EdDSA"}), &json!([1, 2, 3]), b"sig");
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::Decoding, "invalid_payload");
    Ok(())
}

#[test]
fn test_oversized_token_is_rejected_before_decoding() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    let huge = format!("{}.{}.{}", "a".repeat(4096), "b".repeat(4096), "c");
    gate.authenticate_at(&TestRequest::new().bearer(&huge).build(), TEST_NOW)
        .assert_rejected_at(Stage::Decoding, "token_too_large");
    Ok(())
}

#[test]
fn test_decode_then_encode_reproduces_token() -> Result<(), anyhow::Error> {
    let (_, signer) = ed25519_gate()?;
    let token = valid_claims().with_scope(SCOPE_READ).sign(&signer);

    let decoded = DecodedToken::decode_str(&token)?;

    assert_eq!(decoded.encode(), token);
    Ok(())
}

// ============================================================================
// Verification and validation scenarios
// ============================================================================

#[test]
fn test_tampered_signature_is_rejected() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = tamper_signature(&valid_claims().sign(&signer));
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "signature_invalid");
    Ok(())
}

#[test]
fn test_swapped_payload_is_rejected() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().sign(&signer);
    let forged = swap_payload(
        &token,
        &json!({"sub": "admin", "iss": TEST_ISSUER, "aud": TEST_AUDIENCE, "exp": TEST_NOW + 60}),
    );
    gate.authenticate_at(&TestRequest::new().bearer(&forged).build(), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "signature_invalid");
    Ok(())
}

#[test]
fn test_signature_is_checked_before_claims() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = tamper_signature(&valid_claims().expires_in(-3600).sign(&signer));
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "signature_invalid");
    Ok(())
}

#[test]
fn test_token_from_unknown_key_is_rejected() -> Result<(), anyhow::Error> {
    let (gate, _) = ed25519_gate()?;
    let other = test_signing_key(TEST_KEY_SEED_2, TEST_KEY_ID_2)?;
    let token = valid_claims().sign(&other.signer()?);
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "unknown_key");
    Ok(())
}

#[test]
fn test_issuer_mismatch() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().with_issuer("https://evil.test").sign(&signer);
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::ValidatingClaims, "issuer_mismatch");
    Ok(())
}

#[test]
fn test_audience_mismatch() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims()
        .with_audiences(&["billing", "reports"])
        .sign(&signer);
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::ValidatingClaims, "audience_mismatch");
    Ok(())
}

#[test]
fn test_missing_required_claim() -> Result<(), anyhow::Error> {
    let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let policy = TokenPolicy::builder()
        .algorithm(Algorithm::EdDSA)
        .keys(KeySet::new().with_key(Some(TEST_KEY_ID_1), key.verification_key()?))
        .required_claims(["tenant", "exp"])
        .build()?;
    let gate = AuthenticationGate::new(
        policy,
        ExtractorChain::new().with(AuthorizationHeaderExtractor::default()),
    );

    let token = valid_claims().sign(&key.signer()?);
    let rejection = gate
        .authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::ValidatingClaims, "missing_claim")
        .clone();
    assert_eq!(
        rejection.to_string(),
        "Authentication rejected while validating_claims: Missing required claim: tenant"
    );

    let with_tenant = valid_claims().with_claim("tenant", "acme").sign(&key.signer()?);
    gate.authenticate_at(&TestRequest::new().bearer(&with_tenant).build(), TEST_NOW)
        .assert_authenticated();
    Ok(())
}

#[test]
fn test_missing_subject_is_missing_claim() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().without("sub").sign(&signer);
    gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW)
        .assert_rejected_at(Stage::ValidatingClaims, "missing_claim");
    Ok(())
}

#[test]
fn test_rejection_display_never_contains_token() -> Result<(), anyhow::Error> {
    let (gate, signer) = ed25519_gate()?;
    let token = valid_claims().expires_in(-3600).sign(&signer);
    let result = gate.authenticate_at(&TestRequest::new().bearer(&token).build(), TEST_NOW);

    let rejection = result.assert_rejected_with("token_expired");
    let rendered = format!("{rejection} {rejection:?}");
    for segment in token.split('.') {
        assert!(!rendered.contains(segment), "rejection leaked a token segment");
    }
    Ok(())
}
