//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for pipeline outcomes.

use bearer_gate::{AuthenticationResult, Identity, Rejection, Stage};

/// Custom assertions for authentication results
///
/// # Example
/// ```rust,ignore
/// gate.authenticate(&request)
///     .assert_authenticated()
///     .assert_id("alice");
///
/// gate.authenticate(&expired)
///     .assert_rejected_at(Stage::ValidatingClaims, "token_expired");
/// ```
pub trait AuthenticationAssertions {
    /// Assert that the request was authenticated and return the identity
    fn assert_authenticated(&self) -> &Identity;

    /// Assert that the request was rejected with the given reason code
    fn assert_rejected_with(&self, code: &str) -> &Rejection;

    /// Assert that the request was rejected at `stage` with `code`
    fn assert_rejected_at(&self, stage: Stage, code: &str) -> &Rejection;
}

impl AuthenticationAssertions for AuthenticationResult {
    fn assert_authenticated(&self) -> &Identity {
        match self {
            AuthenticationResult::Authenticated(identity) => identity,
            AuthenticationResult::Rejected(rejection) => {
                panic!("Expected authenticated request, got rejection: {rejection}")
            }
        }
    }

    fn assert_rejected_with(&self, code: &str) -> &Rejection {
        match self {
            AuthenticationResult::Rejected(rejection) => {
                assert_eq!(
                    rejection.code(),
                    code,
                    "Unexpected rejection reason: {rejection}"
                );
                rejection
            }
            AuthenticationResult::Authenticated(identity) => {
                panic!("Expected rejection '{code}', got identity {identity:?}")
            }
        }
    }

    fn assert_rejected_at(&self, stage: Stage, code: &str) -> &Rejection {
        let rejection = self.assert_rejected_with(code);
        assert_eq!(
            rejection.stage(),
            stage,
            "Rejection '{code}' raised at the wrong stage"
        );
        rejection
    }
}

/// Assertions on an authenticated identity
pub trait IdentityAssertions {
    /// Assert the identity id
    fn assert_id(&self, expected: &str) -> &Self;

    /// Assert that the identity carries `scope`
    fn assert_has_scope(&self, scope: &str) -> &Self;

    /// Assert a string claim value
    fn assert_claim_str(&self, name: &str, expected: &str) -> &Self;
}

impl IdentityAssertions for Identity {
    fn assert_id(&self, expected: &str) -> &Self {
        assert_eq!(self.id(), expected, "Unexpected identity id");
        self
    }

    fn assert_has_scope(&self, scope: &str) -> &Self {
        assert!(
            self.claims().has_scope(scope),
            "Expected scope '{scope}', got {:?}",
            self.claims().scopes().collect::<Vec<_>>()
        );
        self
    }

    fn assert_claim_str(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(
            self.claims().get_str(name),
            Some(expected),
            "Unexpected value for claim '{name}'"
        );
        self
    }
}
