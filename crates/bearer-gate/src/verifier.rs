//! Signature verification.
//!
//! Order of checks is fixed:
//!
//! 1. `alg` must parse and be in the policy allow-list
//! 2. a key compatible with `alg` must be selected (by `kid`, or unique)
//! 3. the signature must verify over the retained `header.payload` bytes
//!
//! Nothing cryptographic happens until step 1 has passed, so a token can
//! never choose its own algorithm. HMAC comparison is constant time via
//! `ring::hmac::verify`.

use crate::algorithm::Algorithm;
use crate::codec::DecodedToken;
use crate::error::Failure;
use crate::keys::{hmac_secret_bytes, RsaPublicKey, VerificationKey};
use crate::policy::TokenPolicy;
use ring::{hmac, signature};

/// Verify the signature of a decoded token against the policy.
///
/// # Errors
///
/// - [`Failure::AlgorithmNotAllowed`] when `alg` is missing, unknown, `none`
///   or outside the allow-list
/// - [`Failure::UnknownKey`] when no usable key is configured
/// - [`Failure::SignatureInvalid`] when the signature does not verify
pub fn verify(token: &DecodedToken, policy: &TokenPolicy) -> Result<Algorithm, Failure> {
    let alg = allowed_algorithm(token, policy)?;

    let kid = token.header().kid();
    let Some(key) = policy.keys().select(kid, alg) else {
        tracing::debug!(
            target: "bearer_gate.verifier",
            alg = %alg,
            kid = ?kid,
            "Token rejected: no matching verification key"
        );
        return Err(Failure::UnknownKey);
    };

    verify_signature(key, alg, token.signing_input(), token.signature())?;
    Ok(alg)
}

fn allowed_algorithm(token: &DecodedToken, policy: &TokenPolicy) -> Result<Algorithm, Failure> {
    let Some(name) = token.header().alg() else {
        tracing::debug!(target: "bearer_gate.verifier", "Token rejected: missing alg header");
        return Err(Failure::AlgorithmNotAllowed);
    };

    match name.parse::<Algorithm>() {
        Ok(alg) if policy.allows(alg) => Ok(alg),
        Ok(alg) => {
            tracing::debug!(
                target: "bearer_gate.verifier",
                alg = %alg,
                "Token rejected: algorithm not in allow-list"
            );
            Err(Failure::AlgorithmNotAllowed)
        }
        Err(_) => {
            tracing::debug!(
                target: "bearer_gate.verifier",
                "Token rejected: unsupported algorithm"
            );
            Err(Failure::AlgorithmNotAllowed)
        }
    }
}

/// Verify `signature` over `message` with `key` under `alg`.
///
/// # Errors
///
/// Returns [`Failure::UnknownKey`] if the key does not belong to `alg`'s
/// family and [`Failure::SignatureInvalid`] on mismatch.
pub fn verify_signature(
    key: &VerificationKey,
    alg: Algorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Failure> {
    let verified = match (key, alg) {
        (VerificationKey::Hmac(secret), Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => {
            let hmac_alg = match alg {
                Algorithm::HS384 => hmac::HMAC_SHA384,
                Algorithm::HS512 => hmac::HMAC_SHA512,
                _ => hmac::HMAC_SHA256,
            };
            let hmac_key = hmac::Key::new(hmac_alg, hmac_secret_bytes(secret));
            hmac::verify(&hmac_key, message, signature).is_ok()
        }
        (VerificationKey::Rsa(rsa), _) => {
            let Some(params) = rsa_parameters(alg) else {
                return Err(Failure::UnknownKey);
            };
            match rsa {
                RsaPublicKey::Pkcs1Der(der) => signature::UnparsedPublicKey::new(params, der)
                    .verify(message, signature)
                    .is_ok(),
                RsaPublicKey::Components { n, e } => signature::RsaPublicKeyComponents { n, e }
                    .verify(params, message, signature)
                    .is_ok(),
            }
        }
        (VerificationKey::EcP256(point), Algorithm::ES256) => {
            signature::UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_FIXED, point)
                .verify(message, signature)
                .is_ok()
        }
        (VerificationKey::EcP384(point), Algorithm::ES384) => {
            signature::UnparsedPublicKey::new(&signature::ECDSA_P384_SHA384_FIXED, point)
                .verify(message, signature)
                .is_ok()
        }
        (VerificationKey::Ed25519(public_key), Algorithm::EdDSA) => {
            signature::UnparsedPublicKey::new(&signature::ED25519, public_key)
                .verify(message, signature)
                .is_ok()
        }
        _ => return Err(Failure::UnknownKey),
    };

    if verified {
        Ok(())
    } else {
        tracing::debug!(
            target: "bearer_gate.verifier",
            alg = %alg,
            "Token rejected: signature verification failed"
        );
        Err(Failure::SignatureInvalid)
    }
}

fn rsa_parameters(alg: Algorithm) -> Option<&'static signature::RsaParameters> {
    match alg {
        Algorithm::RS256 => Some(&signature::RSA_PKCS1_2048_8192_SHA256),
        Algorithm::RS384 => Some(&signature::RSA_PKCS1_2048_8192_SHA384),
        Algorithm::RS512 => Some(&signature::RSA_PKCS1_2048_8192_SHA512),
        Algorithm::PS256 => Some(&signature::RSA_PSS_2048_8192_SHA256),
        Algorithm::PS384 => Some(&signature::RSA_PSS_2048_8192_SHA384),
        Algorithm::PS512 => Some(&signature::RSA_PSS_2048_8192_SHA512),
        _ => None,
    }
}
