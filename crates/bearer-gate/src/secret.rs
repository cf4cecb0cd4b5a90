//! Secret types for protecting key material from accidental logging.
//!
//! Re-exports the [`secrecy`] types used throughout the crate. HMAC secrets
//! and private signing keys are held in `SecretBox<Vec<u8>>` so that any
//! `Debug` output (including `tracing` fields) shows a redaction marker, and
//! the bytes are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use bearer_gate::secret::{ExposeSecret, SecretBox};
//!
//! let secret = SecretBox::new(Box::new(b"hmac-secret".to_vec()));
//! assert!(format!("{secret:?}").contains("REDACTED"));
//! assert_eq!(secret.expose_secret().as_slice(), b"hmac-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Wrap raw key bytes in a `SecretBox`.
#[must_use]
pub fn secret_bytes(bytes: impl Into<Vec<u8>>) -> SecretBox<Vec<u8>> {
    SecretBox::new(Box::new(bytes.into()))
}

/// Clone a secret byte buffer without exposing it outside this call.
///
/// `SecretBox<Vec<u8>>` is not `Clone`, so key types that need to be cloned
/// go through here.
#[must_use]
pub fn clone_secret_bytes(secret: &SecretBox<Vec<u8>>) -> SecretBox<Vec<u8>> {
    SecretBox::new(Box::new(secret.expose_secret().clone()))
}
