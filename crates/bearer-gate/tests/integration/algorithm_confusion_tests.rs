//! Algorithm confusion and downgrade attempts
//!
//! The allow-list is consulted before any key is selected, and a key is only
//! ever used with an algorithm of its own family. These tests forge tokens the
//! way an attacker would and check that none of them get past the verifier.

use bearer_gate::{
    Algorithm, AuthenticationGate, ExtractorChain, JwkSet, KeyError, KeyFamily, KeySet,
    PolicyError, RawToken, Stage, TokenPolicy, TokenSigner, VerificationKey,
};
use bearer_gate_test_utils::*;
use serde_json::json;

// ============================================================================
// Helper Functions
// ============================================================================

fn gate_for(algorithms: &[Algorithm], keys: KeySet) -> Result<AuthenticationGate, anyhow::Error> {
    let policy = TokenPolicy::builder()
        .algorithms(algorithms.iter().copied())
        .keys(keys)
        .build()?;
    Ok(AuthenticationGate::new(policy, ExtractorChain::new()))
}

fn raw(token: &str) -> RawToken {
    RawToken::new(token).expect("token should not be empty")
}

fn claims() -> serde_json::Value {
    json!({"sub": TEST_SUBJECT, "exp": TEST_NOW + 3600})
}

// ============================================================================
// alg: none
// ============================================================================

#[test]
fn test_alg_none_is_rejected_in_every_spelling() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;

    for alg in ["none", "None", "NONE", ""] {
        let token = encode_unsigned(&json!({"alg": alg, "typ": "JWT"}), &claims(), b"");
        gate.authenticate_token(&raw(&token), TEST_NOW)
            .assert_rejected_at(Stage::VerifyingSignature, "algorithm_not_allowed");
    }
    Ok(())
}

#[test]
fn test_missing_alg_is_rejected() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;
    let token = encode_unsigned(&json!({"typ": "JWT"}), &claims(), b"signature");

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "algorithm_not_allowed");
    Ok(())
}

#[test]
fn test_non_string_alg_is_invalid_payload() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;
    let token = encode_unsigned(&json!({"alg": ["HS256"]}), &claims(), b"signature");

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::Decoding, "invalid_payload");
    Ok(())
}

// ============================================================================
// Allow-list precedes signature computation
// ============================================================================

/// A correctly signed HS384 token is still rejected when only HS256 is
/// allowed, even though the key would verify it.
#[test]
fn test_correct_signature_with_disallowed_algorithm() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;
    let signer = TokenSigner::hmac(Algorithm::HS384, TEST_HMAC_SECRET)?;
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&signer);

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "algorithm_not_allowed");
    Ok(())
}

#[test]
fn test_header_algorithm_names_are_case_sensitive() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;
    let token = encode_unsigned(&json!({"alg": "hs256"}), &claims(), b"signature");

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_with("algorithm_not_allowed");
    Ok(())
}

// ============================================================================
// Public key used as an HMAC secret
// ============================================================================

/// Classic confusion: sign HS256 with the server's Ed25519 public key against
/// a policy that only allows EdDSA.
#[test]
fn test_hs256_against_eddsa_only_policy() -> Result<(), anyhow::Error> {
    let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let gate = gate_for(
        &[Algorithm::EdDSA],
        KeySet::new().with_key(Some(TEST_KEY_ID_1), key.verification_key()?),
    )?;

    let forger = TokenSigner::hmac(Algorithm::HS256, &key.public_key)?.with_key_id(TEST_KEY_ID_1);
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&forger);

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "algorithm_not_allowed");
    Ok(())
}

/// With HS256 also allowed, the Ed25519 key named by `kid` is still never
/// treated as an HMAC secret.
#[test]
fn test_hs256_with_asymmetric_kid_in_mixed_policy() -> Result<(), anyhow::Error> {
    let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let gate = gate_for(
        &[Algorithm::EdDSA, Algorithm::HS256],
        KeySet::new()
            .with_key(Some(TEST_KEY_ID_1), key.verification_key()?)
            .with_key(Some(TEST_KEY_ID_HMAC), VerificationKey::hmac(TEST_HMAC_SECRET)),
    )?;

    let forger = TokenSigner::hmac(Algorithm::HS256, &key.public_key)?.with_key_id(TEST_KEY_ID_1);
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&forger);
    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "unknown_key");

    // Without a kid, only the real HMAC key is a candidate, and it does not
    // match the forged signature.
    let anonymous = TokenSigner::hmac(Algorithm::HS256, &key.public_key)?;
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&anonymous);
    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "signature_invalid");
    Ok(())
}

#[test]
fn test_rsa_key_is_never_an_hmac_secret() -> Result<(), anyhow::Error> {
    let modulus = vec![0xc5; 256];
    let exponent = vec![0x01, 0x00, 0x01];
    let gate = gate_for(
        &[Algorithm::RS256, Algorithm::HS256],
        KeySet::new().with_key(
            Some("rsa-1"),
            VerificationKey::rsa_components(modulus.clone(), exponent)?,
        ),
    )?;

    let forger = TokenSigner::hmac(Algorithm::HS256, &modulus)?.with_key_id("rsa-1");
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&forger);

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "unknown_key");
    Ok(())
}

// ============================================================================
// Empty HMAC secret
// ============================================================================

/// An HMAC tag over an empty key is computable by anyone, so such a key never
/// makes it into a policy, whether supplied directly or through a JWKS.
#[test]
fn test_empty_hmac_secret_never_reaches_a_policy() -> Result<(), anyhow::Error> {
    let err = gate_for(
        &[Algorithm::HS256],
        KeySet::new().with_key(None, VerificationKey::hmac(Vec::new())),
    )
    .unwrap_err();
    assert_eq!(
        err.downcast_ref::<PolicyError>(),
        Some(&PolicyError::InvalidKey(KeyError::InvalidKey(KeyFamily::Hmac)))
    );

    let jwks = JwkSet::from_json(r#"{"keys": [{"kty": "oct", "kid": "empty", "k": ""}]}"#)?;
    assert_eq!(
        KeySet::from_jwks(&jwks).unwrap_err(),
        KeyError::InvalidKey(KeyFamily::Hmac)
    );

    // Issuance refuses the same key
    assert!(TokenSigner::hmac(Algorithm::HS256, b"").is_err());
    Ok(())
}

// ============================================================================
// Key selection
// ============================================================================

#[test]
fn test_ambiguous_keys_without_kid_are_rejected() -> Result<(), anyhow::Error> {
    let gate = gate_for(
        &[Algorithm::HS256],
        KeySet::new()
            .with_key(None, VerificationKey::hmac(TEST_HMAC_SECRET))
            .with_key(None, VerificationKey::hmac(test_hmac_secret(7, 32))),
    )?;
    let signer = TokenSigner::hmac(Algorithm::HS256, TEST_HMAC_SECRET)?;
    let token = TestTokenBuilder::new().at(TEST_NOW).sign(&signer);

    gate.authenticate_token(&raw(&token), TEST_NOW)
        .assert_rejected_at(Stage::VerifyingSignature, "unknown_key");
    Ok(())
}

#[test]
fn test_kid_selects_among_several_keys() -> Result<(), anyhow::Error> {
    let first = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
    let second = test_signing_key(TEST_KEY_SEED_2, TEST_KEY_ID_2)?;
    let gate = gate_for(
        &[Algorithm::EdDSA],
        KeySet::new()
            .with_key(Some(TEST_KEY_ID_1), first.verification_key()?)
            .with_key(Some(TEST_KEY_ID_2), second.verification_key()?),
    )?;

    for key in [&first, &second] {
        let token = TestTokenBuilder::new().at(TEST_NOW).sign(&key.signer()?);
        gate.authenticate_token(&raw(&token), TEST_NOW)
            .assert_authenticated();
    }

    // Right key, wrong label
    let mislabelled = TestTokenBuilder::new()
        .at(TEST_NOW)
        .sign(&first.signer()?.with_key_id(TEST_KEY_ID_2));
    gate.authenticate_token(&raw(&mislabelled), TEST_NOW)
        .assert_rejected_with("signature_invalid");
    Ok(())
}
