//! Token issuance (encode direction).
//!
//! Produces compact JWTs with a `{alg, typ: "JWT", kid?}` header. Intended for
//! hosts that issue their own tokens and for tests; the signing key stays
//! inside ring's key types and is never exposed.
//!
//! RSA signing is not offered: ring can only load RSA private keys from
//! PKCS#8 documents produced elsewhere, and hosts issuing RSA tokens do so
//! from their identity provider. RSA tokens can still be verified.

use crate::algorithm::Algorithm;
use crate::claims::ClaimSet;
use crate::codec::{encode_segment, encode_signing_input};
use crate::keys::VerificationKey;
use ring::hmac;
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::instrument;

/// Errors issuing a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    /// The algorithm does not fit the key, or is not offered for signing.
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(Algorithm),

    /// Key material could not be loaded.
    #[error("Invalid signing key")]
    InvalidKey,

    /// Claims could not be serialized.
    #[error("Claims serialization failed")]
    Serialization,

    /// The signing operation failed.
    #[error("Signing failed")]
    SigningFailed,
}

enum SigningKey {
    Hmac(hmac::Key),
    Ed25519(Ed25519KeyPair),
    Ecdsa(EcdsaKeyPair),
}

/// Signs claims into compact JWTs.
pub struct TokenSigner {
    algorithm: Algorithm,
    kid: Option<String>,
    key: SigningKey,
    rng: SystemRandom,
}

impl TokenSigner {
    /// HMAC signer for HS256, HS384 or HS512.
    ///
    /// # Errors
    ///
    /// [`SignError::UnsupportedAlgorithm`] for a non-HMAC algorithm,
    /// [`SignError::InvalidKey`] for an empty secret.
    pub fn hmac(algorithm: Algorithm, secret: &[u8]) -> Result<Self, SignError> {
        let hmac_alg = match algorithm {
            Algorithm::HS256 => hmac::HMAC_SHA256,
            Algorithm::HS384 => hmac::HMAC_SHA384,
            Algorithm::HS512 => hmac::HMAC_SHA512,
            other => return Err(SignError::UnsupportedAlgorithm(other)),
        };
        if secret.is_empty() {
            return Err(SignError::InvalidKey);
        }
        Ok(Self::with_key(algorithm, SigningKey::Hmac(hmac::Key::new(hmac_alg, secret))))
    }

    /// Ed25519 signer from a PKCS#8 (v1 or v2) document.
    ///
    /// # Errors
    ///
    /// [`SignError::InvalidKey`] if the document does not hold an Ed25519 key.
    pub fn ed25519_pkcs8(pkcs8: &[u8]) -> Result<Self, SignError> {
        let pair =
            Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8).map_err(|_| SignError::InvalidKey)?;
        Ok(Self::with_key(Algorithm::EdDSA, SigningKey::Ed25519(pair)))
    }

    /// ECDSA signer for ES256 or ES384 from a PKCS#8 document.
    ///
    /// # Errors
    ///
    /// [`SignError::UnsupportedAlgorithm`] for a non-ECDSA algorithm,
    /// [`SignError::InvalidKey`] if the document does not hold a key on the
    /// algorithm's curve.
    pub fn ecdsa_pkcs8(algorithm: Algorithm, pkcs8: &[u8]) -> Result<Self, SignError> {
        let signing_alg = match algorithm {
            Algorithm::ES256 => &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            Algorithm::ES384 => &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
            other => return Err(SignError::UnsupportedAlgorithm(other)),
        };
        let rng = SystemRandom::new();
        let pair =
            EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8, &rng).map_err(|_| SignError::InvalidKey)?;
        Ok(Self::with_key(algorithm, SigningKey::Ecdsa(pair)))
    }

    fn with_key(algorithm: Algorithm, key: SigningKey) -> Self {
        Self {
            algorithm,
            kid: None,
            key,
            rng: SystemRandom::new(),
        }
    }

    /// Put `kid` in every issued header.
    #[must_use]
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key id written to headers, if any.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Public key matching this signer, for asymmetric algorithms.
    #[must_use]
    pub fn verification_key(&self) -> Option<VerificationKey> {
        let public_key = match &self.key {
            SigningKey::Hmac(_) => return None,
            SigningKey::Ed25519(pair) => pair.public_key().as_ref().to_vec(),
            SigningKey::Ecdsa(pair) => pair.public_key().as_ref().to_vec(),
        };
        let key = match self.algorithm {
            Algorithm::EdDSA => VerificationKey::ed25519(public_key),
            Algorithm::ES256 => VerificationKey::ec_p256(public_key),
            Algorithm::ES384 => VerificationKey::ec_p384(public_key),
            _ => return None,
        };
        key.ok()
    }

    /// Sign a claim set.
    ///
    /// # Errors
    ///
    /// [`SignError::Serialization`] or [`SignError::SigningFailed`].
    #[instrument(skip_all)]
    pub fn sign(&self, claims: &ClaimSet) -> Result<String, SignError> {
        self.sign_map(claims.as_map())
    }

    /// Sign a raw claims map.
    ///
    /// # Errors
    ///
    /// [`SignError::Serialization`] or [`SignError::SigningFailed`].
    pub fn sign_map(&self, claims: &Map<String, Value>) -> Result<String, SignError> {
        let mut header = Map::new();
        header.insert("alg".to_string(), Value::from(self.algorithm.as_str()));
        header.insert("typ".to_string(), Value::from("JWT"));
        if let Some(kid) = &self.kid {
            header.insert("kid".to_string(), Value::from(kid.as_str()));
        }

        let signing_input =
            encode_signing_input(&header, claims).map_err(|_| SignError::Serialization)?;
        let signature = self.sign_bytes(signing_input.as_bytes())?;

        tracing::debug!(
            target: "bearer_gate.signer",
            alg = %self.algorithm,
            kid = ?self.kid,
            "Token signed"
        );

        Ok(format!("{signing_input}.{}", encode_segment(&signature)))
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>, SignError> {
        match &self.key {
            SigningKey::Hmac(key) => Ok(hmac::sign(key, message).as_ref().to_vec()),
            SigningKey::Ed25519(pair) => Ok(pair.sign(message).as_ref().to_vec()),
            SigningKey::Ecdsa(pair) => pair
                .sign(&self.rng, message)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| SignError::SigningFailed),
        }
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
