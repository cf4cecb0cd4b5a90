//! Verification key material and key sets.
//!
//! Keys are typed by family. An HMAC secret, an RSA key, an EC point and an
//! Ed25519 key are different variants, and the verifier only ever pairs a key
//! with algorithms of its own family. A public key therefore can never be
//! reinterpreted as an HMAC secret (the classic RS256 -> HS256 confusion).
//!
//! # Security
//!
//! - HMAC secrets live in `SecretBox` and are zeroized on drop
//! - `Debug` output never shows key bytes
//! - JWK `k` values are redacted in `Debug`

use crate::algorithm::{Algorithm, KeyFamily};
use crate::codec::decode_segment;
use crate::secret::{clone_secret_bytes, secret_bytes, ExposeSecret, SecretBox};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Length of an Ed25519 public key.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// DER prefix of an Ed25519 `SubjectPublicKeyInfo` (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Uncompressed P-256 point: 0x04 || X(32) || Y(32).
const P256_POINT_LEN: usize = 65;

/// Uncompressed P-384 point: 0x04 || X(48) || Y(48).
const P384_POINT_LEN: usize = 97;

/// Errors building key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key bytes have the wrong length or shape for their family.
    #[error("Invalid {0} key material")]
    InvalidKey(KeyFamily),

    /// PEM armor or body could not be parsed.
    #[error("Invalid PEM document")]
    InvalidPem,

    /// A base64url JWK parameter could not be decoded.
    #[error("Invalid encoding for JWK parameter: {0}")]
    InvalidEncoding(&'static str),

    /// A required JWK parameter is absent.
    #[error("Missing JWK parameter: {0}")]
    MissingParameter(&'static str),

    /// JWK `kty` is not one of OKP, RSA, EC, oct.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// JWK `crv` is not supported for its key type.
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// JWK `alg` names an algorithm that does not fit the key.
    #[error("JWK algorithm does not match key type")]
    AlgorithmMismatch,

    /// JWKS document is not valid JSON.
    #[error("Invalid JWKS document")]
    InvalidDocument,
}

// =============================================================================
// Verification keys
// =============================================================================

/// RSA public key in one of the encodings ring accepts.
#[derive(Clone, PartialEq, Eq)]
pub enum RsaPublicKey {
    /// DER `RSAPublicKey` (PKCS#1).
    Pkcs1Der(Vec<u8>),
    /// Big-endian modulus and exponent.
    Components {
        /// Modulus.
        n: Vec<u8>,
        /// Public exponent.
        e: Vec<u8>,
    },
}

/// Key material usable for signature verification.
pub enum VerificationKey {
    /// Shared HMAC secret.
    Hmac(SecretBox<Vec<u8>>),
    /// RSA public key, for RS* and PS*.
    Rsa(RsaPublicKey),
    /// Uncompressed P-256 point, for ES256.
    EcP256(Vec<u8>),
    /// Uncompressed P-384 point, for ES384.
    EcP384(Vec<u8>),
    /// Raw 32-byte Ed25519 public key, for `EdDSA`.
    Ed25519(Vec<u8>),
}

impl VerificationKey {
    /// HMAC secret from raw bytes.
    ///
    /// An empty secret is refused when the key set is validated, which
    /// [`crate::TokenPolicyBuilder::build`] always does.
    #[must_use]
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        VerificationKey::Hmac(secret_bytes(secret))
    }

    /// HMAC secret already held in a `SecretBox`.
    #[must_use]
    pub fn hmac_secret(secret: SecretBox<Vec<u8>>) -> Self {
        VerificationKey::Hmac(secret)
    }

    /// Ed25519 public key from its 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] for any other length.
    pub fn ed25519(public_key: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let public_key = public_key.into();
        if public_key.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(KeyError::InvalidKey(KeyFamily::Ed25519));
        }
        Ok(VerificationKey::Ed25519(public_key))
    }

    /// Ed25519 public key from a `PUBLIC KEY` PEM document.
    ///
    /// The body may hold either the raw 32-byte key or a DER
    /// `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidPem`] for bad armor or base64, and
    /// [`KeyError::InvalidKey`] when the body is neither form.
    pub fn ed25519_from_pem(pem: &str) -> Result<Self, KeyError> {
        let der = pem_body(pem, "PUBLIC KEY")?;
        let raw = match der.strip_prefix(&ED25519_SPKI_PREFIX[..]) {
            Some(raw) => raw.to_vec(),
            None => der,
        };
        Self::ed25519(raw)
    }

    /// RSA public key from DER `RSAPublicKey` (PKCS#1).
    #[must_use]
    pub fn rsa_pkcs1_der(der: impl Into<Vec<u8>>) -> Self {
        VerificationKey::Rsa(RsaPublicKey::Pkcs1Der(der.into()))
    }

    /// RSA public key from an `RSA PUBLIC KEY` PEM document.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidPem`] for bad armor or base64.
    pub fn rsa_from_pem(pem: &str) -> Result<Self, KeyError> {
        Ok(Self::rsa_pkcs1_der(pem_body(pem, "RSA PUBLIC KEY")?))
    }

    /// RSA public key from big-endian modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] when either component is empty.
    pub fn rsa_components(n: impl Into<Vec<u8>>, e: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let (n, e) = (n.into(), e.into());
        if n.is_empty() || e.is_empty() {
            return Err(KeyError::InvalidKey(KeyFamily::Rsa));
        }
        Ok(VerificationKey::Rsa(RsaPublicKey::Components { n, e }))
    }

    /// P-256 public key from an uncompressed SEC1 point.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] unless the input is a 65-byte
    /// uncompressed point.
    pub fn ec_p256(point: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let point = point.into();
        check_uncompressed_point(&point, P256_POINT_LEN, KeyFamily::EcP256)?;
        Ok(VerificationKey::EcP256(point))
    }

    /// P-384 public key from an uncompressed SEC1 point.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] unless the input is a 97-byte
    /// uncompressed point.
    pub fn ec_p384(point: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let point = point.into();
        check_uncompressed_point(&point, P384_POINT_LEN, KeyFamily::EcP384)?;
        Ok(VerificationKey::EcP384(point))
    }

    /// Build a key from a JWK.
    ///
    /// Supports `kty` `oct`, `RSA`, `EC` (P-256, P-384) and `OKP` (Ed25519).
    /// When the JWK names an `alg`, it must belong to the key's family.
    ///
    /// # Errors
    ///
    /// See [`KeyError`].
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyError> {
        let key = match jwk.kty.as_str() {
            "oct" => {
                let key = VerificationKey::Hmac(secret_bytes(jwk_param(jwk.k.as_deref(), "k")?));
                key.validate()?;
                key
            }
            "RSA" => Self::rsa_components(
                jwk_param(jwk.n.as_deref(), "n")?,
                jwk_param(jwk.e.as_deref(), "e")?,
            )?,
            "EC" => {
                let crv = jwk.crv.as_deref().ok_or(KeyError::MissingParameter("crv"))?;
                let mut point = vec![0x04];
                point.extend(jwk_param(jwk.x.as_deref(), "x")?);
                point.extend(jwk_param(jwk.y.as_deref(), "y")?);
                match crv {
                    "P-256" => Self::ec_p256(point)?,
                    "P-384" => Self::ec_p384(point)?,
                    other => return Err(KeyError::UnsupportedCurve(other.to_string())),
                }
            }
            "OKP" => match jwk.crv.as_deref() {
                Some("Ed25519") => Self::ed25519(jwk_param(jwk.x.as_deref(), "x")?)?,
                Some(other) => return Err(KeyError::UnsupportedCurve(other.to_string())),
                None => return Err(KeyError::MissingParameter("crv")),
            },
            other => return Err(KeyError::UnsupportedKeyType(other.to_string())),
        };

        if let Some(alg) = jwk.alg.as_deref() {
            let alg: Algorithm = alg.parse().map_err(|_| KeyError::AlgorithmMismatch)?;
            if alg.family() != key.family() {
                return Err(KeyError::AlgorithmMismatch);
            }
        }

        Ok(key)
    }

    /// Key family.
    #[must_use]
    pub fn family(&self) -> KeyFamily {
        match self {
            VerificationKey::Hmac(_) => KeyFamily::Hmac,
            VerificationKey::Rsa(_) => KeyFamily::Rsa,
            VerificationKey::EcP256(_) => KeyFamily::EcP256,
            VerificationKey::EcP384(_) => KeyFamily::EcP384,
            VerificationKey::Ed25519(_) => KeyFamily::Ed25519,
        }
    }

    /// Check that the key material is usable.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] for an empty HMAC secret. ring
    /// accepts a zero-length HMAC key, and anyone can compute a tag with it.
    pub fn validate(&self) -> Result<(), KeyError> {
        match self {
            VerificationKey::Hmac(secret) if hmac_secret_bytes(secret).is_empty() => {
                Err(KeyError::InvalidKey(KeyFamily::Hmac))
            }
            _ => Ok(()),
        }
    }

    /// Whether this key can verify `alg`.
    #[must_use]
    pub fn supports(&self, alg: Algorithm) -> bool {
        self.family() == alg.family()
    }
}

impl Clone for VerificationKey {
    fn clone(&self) -> Self {
        match self {
            VerificationKey::Hmac(secret) => VerificationKey::Hmac(clone_secret_bytes(secret)),
            VerificationKey::Rsa(key) => VerificationKey::Rsa(key.clone()),
            VerificationKey::EcP256(point) => VerificationKey::EcP256(point.clone()),
            VerificationKey::EcP384(point) => VerificationKey::EcP384(point.clone()),
            VerificationKey::Ed25519(key) => VerificationKey::Ed25519(key.clone()),
        }
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("family", &self.family())
            .field("material", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsaPublicKey::Pkcs1Der(_) => f.write_str("RsaPublicKey::Pkcs1Der"),
            RsaPublicKey::Components { .. } => f.write_str("RsaPublicKey::Components"),
        }
    }
}

fn check_uncompressed_point(point: &[u8], len: usize, family: KeyFamily) -> Result<(), KeyError> {
    if point.len() == len && point.first() == Some(&0x04) {
        Ok(())
    } else {
        Err(KeyError::InvalidKey(family))
    }
}

fn jwk_param(value: Option<&str>, name: &'static str) -> Result<Vec<u8>, KeyError> {
    let value = value.ok_or(KeyError::MissingParameter(name))?;
    decode_segment(value).map_err(|_| KeyError::InvalidEncoding(name))
}

fn pem_body(pem: &str, label: &str) -> Result<Vec<u8>, KeyError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let body = pem
        .trim()
        .strip_prefix(begin.as_str())
        .and_then(|rest| rest.strip_suffix(end.as_str()))
        .ok_or(KeyError::InvalidPem)?;

    let body: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(body)
        .map_err(|_| KeyError::InvalidPem)
}

// =============================================================================
// JWK documents
// =============================================================================

/// JSON Web Key (RFC 7517) as found in a JWKS document.
#[derive(Clone, Deserialize)]
pub struct Jwk {
    /// Key type: `OKP`, `RSA`, `EC` or `oct`.
    pub kty: String,

    /// Key id.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve for `EC` and `OKP` keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// X coordinate (EC) or public key (OKP), base64url.
    #[serde(default)]
    pub x: Option<String>,

    /// Y coordinate (EC), base64url.
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent, base64url.
    #[serde(default)]
    pub e: Option<String>,

    /// Symmetric key value, base64url. Redacted in `Debug`.
    #[serde(default)]
    pub k: Option<String>,

    /// Intended algorithm.
    #[serde(default)]
    pub alg: Option<String>,

    /// Intended use (`sig` or `enc`).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("crv", &self.crv)
            .field("alg", &self.alg)
            .field("use", &self.key_use)
            .field("k", &self.k.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// JSON Web Key Set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    /// Keys in document order.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Parse a JWKS document.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidDocument`] when the input is not a JWKS.
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        serde_json::from_str(json).map_err(|_| KeyError::InvalidDocument)
    }
}

// =============================================================================
// Key sets
// =============================================================================

#[derive(Debug, Clone)]
struct KeyEntry {
    kid: Option<String>,
    key: VerificationKey,
}

/// Keys available to the verifier, optionally labelled with a key id.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    entries: Vec<KeyEntry>,
}

impl KeySet {
    /// Empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, builder style.
    #[must_use]
    pub fn with_key(mut self, kid: Option<&str>, key: VerificationKey) -> Self {
        self.insert(kid, key);
        self
    }

    /// Add a key. A key with the same id replaces the previous one.
    pub fn insert(&mut self, kid: Option<&str>, key: VerificationKey) {
        if let Some(kid) = kid {
            self.entries.retain(|entry| entry.kid.as_deref() != Some(kid));
        }
        self.entries.push(KeyEntry {
            kid: kid.map(str::to_string),
            key,
        });
    }

    /// Build a key set from a JWKS.
    ///
    /// Keys with an unsupported `kty` or curve, or with `use` other than
    /// `sig`, are skipped with a warning so one odd key does not take down
    /// the whole set.
    ///
    /// # Errors
    ///
    /// Returns the error of the first supported key whose parameters are
    /// malformed.
    pub fn from_jwks(jwks: &JwkSet) -> Result<Self, KeyError> {
        let mut set = Self::new();
        for jwk in &jwks.keys {
            if jwk.key_use.as_deref().is_some_and(|key_use| key_use != "sig") {
                tracing::warn!(
                    target: "bearer_gate.keys",
                    kid = ?jwk.kid,
                    "Skipping JWK not intended for signatures"
                );
                continue;
            }
            match VerificationKey::from_jwk(jwk) {
                Ok(key) => set.insert(jwk.kid.as_deref(), key),
                Err(KeyError::UnsupportedKeyType(_) | KeyError::UnsupportedCurve(_)) => {
                    tracing::warn!(
                        target: "bearer_gate.keys",
                        kid = ?jwk.kid,
                        kty = %jwk.kty,
                        "Skipping JWK with unsupported key type"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(set)
    }

    /// Check every key with [`VerificationKey::validate`].
    ///
    /// # Errors
    ///
    /// The first key error found.
    pub fn validate(&self) -> Result<(), KeyError> {
        self.entries.iter().try_for_each(|entry| {
            entry.key.validate().inspect_err(|_| {
                tracing::warn!(
                    target: "bearer_gate.keys",
                    kid = ?entry.kid,
                    family = %entry.key.family(),
                    "Unusable verification key"
                );
            })
        })
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key ids present in the set.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| entry.kid.as_deref())
    }

    /// Whether any key can verify `alg`.
    #[must_use]
    pub fn supports(&self, alg: Algorithm) -> bool {
        self.entries.iter().any(|entry| entry.key.supports(alg))
    }

    /// Select the key for a token.
    ///
    /// With a `kid`, the key with that id, provided it fits `alg`. Without a
    /// `kid`, the single key that fits `alg`; if several fit, the choice is
    /// ambiguous and nothing is selected.
    #[must_use]
    pub fn select(&self, kid: Option<&str>, alg: Algorithm) -> Option<&VerificationKey> {
        match kid {
            Some(kid) => self
                .entries
                .iter()
                .find(|entry| entry.kid.as_deref() == Some(kid))
                .map(|entry| &entry.key)
                .filter(|key| key.supports(alg)),
            None => {
                let mut compatible = self
                    .entries
                    .iter()
                    .map(|entry| &entry.key)
                    .filter(|key| key.supports(alg));
                match (compatible.next(), compatible.next()) {
                    (Some(key), None) => Some(key),
                    _ => None,
                }
            }
        }
    }
}

/// Expose HMAC secret bytes to the verifier only.
pub(crate) fn hmac_secret_bytes(secret: &SecretBox<Vec<u8>>) -> &[u8] {
    secret.expose_secret().as_slice()
}
