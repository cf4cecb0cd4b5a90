//! Fixed test identifiers for deterministic tests
//!
//! Fixed values keep assertions and log output stable across runs.

// Signing key ids
pub const TEST_KEY_ID_1: &str = "test-key-2025-01";
pub const TEST_KEY_ID_2: &str = "test-key-2025-02";
pub const TEST_KEY_ID_HMAC: &str = "test-hmac-2025-01";

// Key seeds for crypto_fixtures
pub const TEST_KEY_SEED_1: u8 = 1;
pub const TEST_KEY_SEED_2: u8 = 2;

// Policy values
pub const TEST_ISSUER: &str = "https://issuer.test";
pub const TEST_AUDIENCE: &str = "bearer-gate-tests";
pub const TEST_REALM: &str = "test-realm";

// Subjects
pub const TEST_SUBJECT: &str = "user-alice";
pub const TEST_SUBJECT_BOB: &str = "user-bob";

// Shared HMAC secret (32 bytes, HS256 minimum)
pub const TEST_HMAC_SECRET: &[u8] = b"test-secret-do-not-use-in-prod!!";

// Scopes
pub const SCOPE_READ: &str = "documents:read";
pub const SCOPE_WRITE: &str = "documents:write";

// Fixed clock for tests that pin "now" (2023-11-14T22:13:20Z)
pub const TEST_NOW: i64 = 1_700_000_000;
