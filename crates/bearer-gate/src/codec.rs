//! Compact JWT codec.
//!
//! Decoding splits `header.payload.signature`, base64url-decodes each segment
//! and parses header and payload as JSON objects. The original encoded
//! `header.payload` bytes are retained verbatim; signatures are always
//! verified over them, never over a re-serialization.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any splitting or decoding
//! - Error variants carry no token content
//! - Header fields are type-checked here so later stages never see a
//!   non-string `alg` or `kid`

use crate::error::CodecError;
use crate::token::RawToken;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical tokens are a few hundred bytes. Anything larger than this is
/// rejected before base64 decoding allocates a buffer for it.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// URL-safe alphabet; writes no padding, accepts input with or without it.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64url-encode without padding.
#[must_use]
pub fn encode_segment(bytes: &[u8]) -> String {
    BASE64URL.encode(bytes)
}

/// Base64url-decode, tolerating padding.
///
/// # Errors
///
/// Returns [`CodecError::InvalidEncoding`] for anything outside the URL-safe
/// alphabet.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, CodecError> {
    BASE64URL
        .decode(segment)
        .map_err(|_| CodecError::InvalidEncoding)
}

// =============================================================================
// Header
// =============================================================================

/// JOSE header of a decoded token.
///
/// `alg`, `kid` and `typ` are surfaced as typed fields; the full object is
/// kept for hosts that need `cty`, `x5t` and friends.
#[derive(Debug, Clone, PartialEq)]
pub struct JoseHeader {
    alg: Option<String>,
    kid: Option<String>,
    typ: Option<String>,
    fields: Map<String, Value>,
}

impl JoseHeader {
    fn from_object(fields: Map<String, Value>) -> Result<Self, CodecError> {
        Ok(Self {
            alg: string_field(&fields, "alg")?,
            kid: string_field(&fields, "kid")?,
            typ: string_field(&fields, "typ")?,
            fields,
        })
    }

    /// Algorithm name as written in the token, if any.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// Key id, if any.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Token type, if any.
    #[must_use]
    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    /// Full header object.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<Option<String>, CodecError> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => {
            tracing::debug!(
                target: "bearer_gate.codec",
                field = name,
                "Header field is not a string"
            );
            Err(CodecError::InvalidPayload)
        }
    }
}

// =============================================================================
// Decoded token
// =============================================================================

/// A structurally valid, not yet verified token.
#[derive(Clone)]
pub struct DecodedToken {
    raw: String,
    header_end: usize,
    payload_end: usize,
    header: JoseHeader,
    claims: Map<String, Value>,
    signature: Vec<u8>,
}

impl DecodedToken {
    /// Decode a raw token.
    ///
    /// # Errors
    ///
    /// - [`CodecError::TokenTooLarge`] above [`MAX_JWT_SIZE_BYTES`]
    /// - [`CodecError::MalformedStructure`] unless there are exactly two `.`
    /// - [`CodecError::InvalidEncoding`] for a segment that is not base64url
    /// - [`CodecError::InvalidPayload`] when header or payload is not a JSON
    ///   object
    pub fn decode(token: &RawToken) -> Result<Self, CodecError> {
        Self::decode_str(token.as_str())
    }

    /// Decode from a string slice. See [`DecodedToken::decode`].
    ///
    /// # Errors
    ///
    /// Same as [`DecodedToken::decode`].
    pub fn decode_str(token: &str) -> Result<Self, CodecError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "bearer_gate.codec",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum"
            );
            return Err(CodecError::TokenTooLarge);
        }

        let mut separators = token.match_indices('.').map(|(index, _)| index);
        let (Some(header_end), Some(payload_end), None) =
            (separators.next(), separators.next(), separators.next())
        else {
            tracing::debug!(
                target: "bearer_gate.codec",
                "Token rejected: expected exactly three segments"
            );
            return Err(CodecError::MalformedStructure);
        };

        let header_b64 = token.get(..header_end).ok_or(CodecError::MalformedStructure)?;
        let payload_b64 = token
            .get(header_end + 1..payload_end)
            .ok_or(CodecError::MalformedStructure)?;
        let signature_b64 = token
            .get(payload_end + 1..)
            .ok_or(CodecError::MalformedStructure)?;

        let header_bytes = decode_segment(header_b64)?;
        let payload_bytes = decode_segment(payload_b64)?;
        let signature = decode_segment(signature_b64)?;

        let header = JoseHeader::from_object(parse_object(&header_bytes, "header")?)?;
        let claims = parse_object(&payload_bytes, "payload")?;

        Ok(Self {
            raw: token.to_string(),
            header_end,
            payload_end,
            header,
            claims,
            signature,
        })
    }

    /// JOSE header.
    #[must_use]
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    /// Payload claims.
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Consume into the payload claims.
    #[must_use]
    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }

    /// Decoded signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The exact `header.payload` bytes the signature covers.
    #[must_use]
    pub fn signing_input(&self) -> &[u8] {
        self.raw
            .as_bytes()
            .get(..self.payload_end)
            .unwrap_or_default()
    }

    /// Header segment as it appeared in the token.
    #[must_use]
    pub fn encoded_header(&self) -> &str {
        self.raw.get(..self.header_end).unwrap_or_default()
    }

    /// Payload segment as it appeared in the token.
    #[must_use]
    pub fn encoded_payload(&self) -> &str {
        self.raw
            .get(self.header_end + 1..self.payload_end)
            .unwrap_or_default()
    }

    /// Re-encode to compact form.
    ///
    /// Header and payload are the retained segments; the signature is
    /// re-encoded without padding. For unpadded input this reproduces the
    /// original token exactly.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            self.encoded_header(),
            self.encoded_payload(),
            encode_segment(&self.signature)
        )
    }
}

impl fmt::Debug for DecodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedToken")
            .field("header", &self.header)
            .field("claims", &self.claims.keys().collect::<Vec<_>>())
            .field("signature_len", &self.signature.len())
            .finish_non_exhaustive()
    }
}

fn parse_object(bytes: &[u8], segment: &'static str) -> Result<Map<String, Value>, CodecError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            tracing::debug!(
                target: "bearer_gate.codec",
                segment,
                "Token rejected: segment is not a JSON object"
            );
            Err(CodecError::InvalidPayload)
        }
    }
}

/// Encode header and claims into the `header.payload` signing input.
pub(crate) fn encode_signing_input(
    header: &Map<String, Value>,
    claims: &Map<String, Value>,
) -> Result<String, serde_json::Error> {
    let header_json = serde_json::to_vec(header)?;
    let claims_json = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}",
        encode_segment(&header_json),
        encode_segment(&claims_json)
    ))
}
