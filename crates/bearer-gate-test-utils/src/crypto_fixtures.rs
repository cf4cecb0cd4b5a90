//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs and HMAC secrets. Ed25519 fixtures
//! are deterministic based on seed values; ECDSA keys cannot be derived from
//! a seed with ring, so [`TestEcdsaKey`] is freshly generated.

use base64::engine::general_purpose;
use base64::Engine;
use bearer_gate::{Algorithm, KeyError, SignError, TokenSigner, VerificationKey};
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Signer rejected fixture key: {0}")]
    Signer(#[from] SignError),

    #[error("Verification key rejected fixture key: {0}")]
    Key(#[from] KeyError),
}

/// SubjectPublicKeyInfo prefix for a raw Ed25519 public key.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Deterministic Ed25519 keypair.
#[derive(Debug, Clone)]
pub struct TestEd25519Key {
    /// Key id used in token headers and key sets.
    pub kid: String,
    /// PKCS#8 v1 document holding the seed.
    pub pkcs8: Vec<u8>,
    /// Raw 32-byte public key.
    pub public_key: Vec<u8>,
}

impl TestEd25519Key {
    /// Signer issuing `EdDSA` tokens with this key's `kid`.
    pub fn signer(&self) -> Result<TokenSigner, FixtureError> {
        Ok(TokenSigner::ed25519_pkcs8(&self.pkcs8)?.with_key_id(self.kid.clone()))
    }

    /// Verification key for the public half.
    pub fn verification_key(&self) -> Result<VerificationKey, FixtureError> {
        Ok(VerificationKey::ed25519(self.public_key.clone())?)
    }

    /// Public key as a `PUBLIC KEY` PEM document (SubjectPublicKeyInfo).
    pub fn public_key_pem(&self) -> String {
        let mut spki = ED25519_SPKI_PREFIX.to_vec();
        spki.extend_from_slice(&self.public_key);
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            general_purpose::STANDARD.encode(spki)
        )
    }

    /// Public key as a JWK object.
    pub fn jwk(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig",
            "x": general_purpose::URL_SAFE_NO_PAD.encode(&self.public_key),
        })
    }
}

/// Generate a deterministic Ed25519 signing key for testing.
///
/// The same seed always produces the same keypair, ensuring test reproducibility.
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1, TEST_KEY_ID_1)?;
/// let token = key.signer()?.sign(&claims)?;
/// ```
pub fn test_signing_key(seed: u8, kid: &str) -> Result<TestEd25519Key, FixtureError> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    Ok(TestEd25519Key {
        kid: kid.to_string(),
        pkcs8: build_pkcs8_from_seed(&seed_bytes),
        public_key: key_pair.public_key().as_ref().to_vec(),
    })
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Test-only; production keys come from ring::rand::SystemRandom.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = vec![0x30, 0x2e, 0x02, 0x01, 0x00];
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}

/// Freshly generated ECDSA keypair for ES256 or ES384.
#[derive(Debug, Clone)]
pub struct TestEcdsaKey {
    /// Key id used in token headers and key sets.
    pub kid: String,
    /// Signing algorithm.
    pub algorithm: Algorithm,
    /// PKCS#8 document.
    pub pkcs8: Vec<u8>,
    /// Uncompressed SEC1 public point.
    pub public_key: Vec<u8>,
}

impl TestEcdsaKey {
    /// Signer issuing tokens with this key's `kid`.
    pub fn signer(&self) -> Result<TokenSigner, FixtureError> {
        Ok(TokenSigner::ecdsa_pkcs8(self.algorithm, &self.pkcs8)?.with_key_id(self.kid.clone()))
    }

    /// Verification key for the public point.
    pub fn verification_key(&self) -> Result<VerificationKey, FixtureError> {
        match self.algorithm {
            Algorithm::ES384 => Ok(VerificationKey::ec_p384(self.public_key.clone())?),
            _ => Ok(VerificationKey::ec_p256(self.public_key.clone())?),
        }
    }

    /// Public key as an EC JWK object.
    pub fn jwk(&self) -> serde_json::Value {
        let coordinate_len = (self.public_key.len() - 1) / 2;
        let (x, y) = self.public_key[1..].split_at(coordinate_len);
        let crv = match self.algorithm {
            Algorithm::ES384 => "P-384",
            _ => "P-256",
        };
        serde_json::json!({
            "kty": "EC",
            "crv": crv,
            "kid": self.kid,
            "alg": self.algorithm.as_str(),
            "x": general_purpose::URL_SAFE_NO_PAD.encode(x),
            "y": general_purpose::URL_SAFE_NO_PAD.encode(y),
        })
    }
}

/// Generate an ECDSA test key for `algorithm` (ES256 or ES384).
pub fn test_ecdsa_key(algorithm: Algorithm, kid: &str) -> Result<TestEcdsaKey, FixtureError> {
    let signing_alg = match algorithm {
        Algorithm::ES256 => &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
        Algorithm::ES384 => &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
        other => {
            return Err(FixtureError::Crypto(format!(
                "{other} is not an ECDSA algorithm"
            )))
        }
    };
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate ECDSA key: {:?}", e)))?;
    let pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8.as_ref(), &rng)
        .map_err(|e| FixtureError::Crypto(format!("Failed to load ECDSA key: {:?}", e)))?;

    Ok(TestEcdsaKey {
        kid: kid.to_string(),
        algorithm,
        pkcs8: pkcs8.as_ref().to_vec(),
        public_key: pair.public_key().as_ref().to_vec(),
    })
}

/// Deterministic HMAC secret of `len` bytes.
pub fn test_hmac_secret(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_add((i as u8).wrapping_mul(31)))
        .collect()
}

/// HMAC secret as an `oct` JWK object.
pub fn hmac_jwk(kid: &str, secret: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "kty": "oct",
        "kid": kid,
        "k": general_purpose::URL_SAFE_NO_PAD.encode(secret),
    })
}
