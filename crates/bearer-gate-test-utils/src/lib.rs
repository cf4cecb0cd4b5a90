//! # Bearer Gate Test Utilities
//!
//! Shared test utilities for the `bearer-gate` crate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed keys for reproducible tests)
//! - Test data builders (TestTokenBuilder, TestRequest)
//! - Fixed test IDs and policy constants
//! - Custom assertions (AuthenticationAssertions, IdentityAssertions)
//! - One-time tracing setup for test binaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bearer_gate_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     let key = test_signing_key(TEST_KEY_SEED_1, TEST_KEY_ID_1)?;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_user(TEST_SUBJECT)
//!         .with_scope(SCOPE_READ)
//!         .sign(&key.signer()?);
//!
//!     gate.authenticate(&TestRequest::new().bearer(&token).build())
//!         .assert_authenticated()
//!         .assert_has_scope(SCOPE_READ);
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod request;
pub mod test_ids;
pub mod token_builders;
pub mod logging;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use request::*;
pub use test_ids::*;
pub use token_builders::*;
pub use logging::init_test_tracing;
