//! Entry points: the externally visible response to a rejected request.
//!
//! The gate does not decide what a client sees. It hands the [`Rejection`]
//! to an [`EntryPoint`], which turns it into a [`Challenge`]. The stock
//! [`BearerEntryPoint`] produces an RFC 6750 `401` challenge.

use crate::gate::{Rejection, RejectionKind};
use http::{header, HeaderValue, StatusCode};
use serde::Serialize;

/// Default realm for `WWW-Authenticate` challenges.
pub const DEFAULT_REALM: &str = "api";

/// Produces a challenge for a rejected request.
pub trait EntryPoint: Send + Sync {
    /// Build the response description for `rejection`.
    fn challenge(&self, rejection: &Rejection) -> Challenge;
}

/// Response description produced by an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// HTTP status.
    pub status: StatusCode,
    /// `WWW-Authenticate` header value, if any.
    pub www_authenticate: Option<String>,
    /// Stable reason code.
    pub code: &'static str,
    /// Client-safe message.
    pub message: String,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl Challenge {
    /// Render as an `http::Response` with a JSON error body.
    #[must_use]
    pub fn to_response(&self) -> http::Response<String> {
        let body = serde_json::to_string(&ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: &self.message,
            },
        })
        .unwrap_or_default();

        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(challenge) = &self.www_authenticate {
            if let Ok(header_value) = HeaderValue::from_str(challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, header_value);
            }
        }
        response
    }
}

/// RFC 6750 bearer challenge.
///
/// No token presented: `Bearer realm="..."`. Token presented but rejected:
/// `Bearer realm="...", error="invalid_token"`.
#[derive(Debug, Clone)]
pub struct BearerEntryPoint {
    realm: String,
}

impl BearerEntryPoint {
    /// Entry point for `realm`.
    #[must_use]
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    /// Realm reported in challenges.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Default for BearerEntryPoint {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl EntryPoint for BearerEntryPoint {
    fn challenge(&self, rejection: &Rejection) -> Challenge {
        let realm = quote(&self.realm);
        let (www_authenticate, message) = match rejection.kind() {
            RejectionKind::NotFound(_) => (
                format!("Bearer realm={realm}"),
                "Authentication required".to_string(),
            ),
            RejectionKind::Codec(_) | RejectionKind::Failure(_) => (
                format!("Bearer realm={realm}, error=\"invalid_token\""),
                "The access token is invalid or expired".to_string(),
            ),
        };

        Challenge {
            status: StatusCode::UNAUTHORIZED,
            www_authenticate: Some(www_authenticate),
            code: rejection.code(),
            message,
        }
    }
}

/// Quoted-string per RFC 7230; control characters are dropped.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars().filter(|c| !c.is_control()) {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
