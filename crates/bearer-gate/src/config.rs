//! Declarative gate configuration.
//!
//! [`GateConfig`] mirrors the options a host exposes for bearer
//! authentication. It deserializes with serde (every field has a default) or
//! loads from `JWT_*` environment variables. Key material is never part of
//! the configuration; it comes from the host's secret store as a
//! [`KeySet`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `JWT_AUTHORIZATION_HEADER_ENABLED` | `true` |
//! | `JWT_AUTHORIZATION_HEADER_PREFIX` | `Bearer` |
//! | `JWT_AUTHORIZATION_HEADER_NAME` | `Authorization` |
//! | `JWT_QUERY_PARAMETER_ENABLED` | `false` |
//! | `JWT_QUERY_PARAMETER_NAME` | `bearer` |
//! | `JWT_THROW_EXCEPTIONS` | `false` |
//! | `JWT_CREATE_ENTRY_POINT` | `true` |
//! | `JWT_ALGORITHMS_ALLOWED` | none (comma list) |
//! | `JWT_ISSUER` | none |
//! | `JWT_AUDIENCE` | none |
//! | `JWT_CLOCK_SKEW_SECONDS` | `300` |
//! | `JWT_REQUIRED_CLAIMS` | none (comma list) |
//! | `JWT_IDENTITY_CLAIM` | `sub` |
//! | `JWT_REALM` | `api` |

use crate::algorithm::Algorithm;
use crate::entry_point::DEFAULT_REALM;
use crate::extractor::{
    ExtractorChain, TokenSource, DEFAULT_HEADER_NAME, DEFAULT_HEADER_PREFIX,
    DEFAULT_QUERY_PARAMETER,
};
use crate::keys::KeySet;
use crate::policy::{
    PolicyError, TokenPolicy, DEFAULT_CLOCK_SKEW, DEFAULT_IDENTITY_CLAIM, MAX_CLOCK_SKEW,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable has an unrecognized value.
    #[error("Invalid boolean: {0}")]
    InvalidBool(String),

    /// Clock skew is not an integer or exceeds the maximum.
    #[error("Invalid clock skew: {0}")]
    InvalidClockSkew(String),

    /// An algorithm name is not supported.
    #[error("Invalid algorithm: {0}")]
    InvalidAlgorithm(String),

    /// The identity claim name is empty.
    #[error("Identity claim must not be empty")]
    InvalidIdentityClaim,

    /// An enabled token source is misconfigured.
    #[error("Invalid token source: {0}")]
    InvalidTokenSource(String),

    /// The token policy could not be built.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Header token source options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorizationHeaderConfig {
    /// Whether the header extractor is registered.
    pub enabled: bool,
    /// Scheme prefix, matched case-sensitively.
    pub prefix: String,
    /// Header name.
    pub name: String,
}

impl Default for AuthorizationHeaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: DEFAULT_HEADER_PREFIX.to_string(),
            name: DEFAULT_HEADER_NAME.to_string(),
        }
    }
}

/// Query parameter token source options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryParameterConfig {
    /// Whether the query parameter extractor is registered.
    pub enabled: bool,
    /// Parameter name.
    pub name: String,
}

impl Default for QueryParameterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: DEFAULT_QUERY_PARAMETER.to_string(),
        }
    }
}

/// Bearer authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Header token source.
    pub authorization_header: AuthorizationHeaderConfig,

    /// Query parameter token source.
    pub query_parameter: QueryParameterConfig,

    /// When true, rejections are returned to the host instead of being
    /// handed to the entry point.
    pub throw_exceptions: bool,

    /// Whether the gate creates its own [`crate::BearerEntryPoint`].
    pub create_entry_point: bool,

    /// Algorithm allow-list. Must not be empty when building a policy.
    pub algorithms_allowed: Vec<Algorithm>,

    /// Expected `iss`.
    pub issuer: Option<String>,

    /// Expected `aud` member.
    pub audience: Option<String>,

    /// Clock skew tolerance in seconds.
    pub clock_skew_seconds: u64,

    /// Claims that must be present.
    pub required_claims: Vec<String>,

    /// Claim the identity id is read from.
    pub identity_claim: String,

    /// Realm reported in `WWW-Authenticate` challenges.
    pub realm: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            authorization_header: AuthorizationHeaderConfig::default(),
            query_parameter: QueryParameterConfig::default(),
            throw_exceptions: false,
            create_entry_point: true,
            algorithms_allowed: Vec::new(),
            issuer: None,
            audience: None,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW.as_secs(),
            required_claims: Vec::new(),
            identity_claim: DEFAULT_IDENTITY_CLAIM.to_string(),
            realm: DEFAULT_REALM.to_string(),
        }
    }
}

impl GateConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`GateConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map of variables (for testing).
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparseable values or when
    /// [`GateConfig::validate`] fails.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(enabled) = parse_bool(vars, "JWT_AUTHORIZATION_HEADER_ENABLED")? {
            config.authorization_header.enabled = enabled;
        }
        if let Some(prefix) = vars.get("JWT_AUTHORIZATION_HEADER_PREFIX") {
            config.authorization_header.prefix.clone_from(prefix);
        }
        if let Some(name) = vars.get("JWT_AUTHORIZATION_HEADER_NAME") {
            config.authorization_header.name.clone_from(name);
        }
        if let Some(enabled) = parse_bool(vars, "JWT_QUERY_PARAMETER_ENABLED")? {
            config.query_parameter.enabled = enabled;
        }
        if let Some(name) = vars.get("JWT_QUERY_PARAMETER_NAME") {
            config.query_parameter.name.clone_from(name);
        }
        if let Some(throw) = parse_bool(vars, "JWT_THROW_EXCEPTIONS")? {
            config.throw_exceptions = throw;
        }
        if let Some(create) = parse_bool(vars, "JWT_CREATE_ENTRY_POINT")? {
            config.create_entry_point = create;
        }

        if let Some(value) = vars.get("JWT_ALGORITHMS_ALLOWED") {
            config.algorithms_allowed = parse_list(value)
                .map(|name| {
                    name.parse::<Algorithm>().map_err(|_| {
                        ConfigError::InvalidAlgorithm(format!(
                            "JWT_ALGORITHMS_ALLOWED contains unsupported algorithm '{name}'"
                        ))
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        config.issuer = non_empty(vars.get("JWT_ISSUER"));
        config.audience = non_empty(vars.get("JWT_AUDIENCE"));

        if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            config.clock_skew_seconds = value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{value_str}': {e}"
                ))
            })?;
        }

        if let Some(value) = vars.get("JWT_REQUIRED_CLAIMS") {
            config.required_claims = parse_list(value).map(str::to_string).collect();
        }
        if let Some(claim) = vars.get("JWT_IDENTITY_CLAIM") {
            config.identity_claim.clone_from(claim);
        }
        if let Some(realm) = vars.get("JWT_REALM") {
            config.realm.clone_from(realm);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check option values that do not depend on key material.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidClockSkew`] above the 600 second maximum
    /// - [`ConfigError::InvalidIdentityClaim`] for an empty identity claim
    /// - [`ConfigError::InvalidTokenSource`] for an enabled source with an
    ///   empty name, or a prefix containing whitespace
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidClockSkew(format!(
                "clock skew must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                self.clock_skew_seconds
            )));
        }

        if self.identity_claim.trim().is_empty() {
            return Err(ConfigError::InvalidIdentityClaim);
        }

        if self.authorization_header.enabled {
            if self.authorization_header.name.trim().is_empty() {
                return Err(ConfigError::InvalidTokenSource(
                    "authorization header name must not be empty".to_string(),
                ));
            }
            if self.authorization_header.prefix.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidTokenSource(
                    "authorization header prefix must not contain whitespace".to_string(),
                ));
            }
        }

        if self.query_parameter.enabled && self.query_parameter.name.trim().is_empty() {
            return Err(ConfigError::InvalidTokenSource(
                "query parameter name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Clock skew tolerance.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_seconds)
    }

    /// Enabled token sources: header first, then query parameter.
    #[must_use]
    pub fn token_sources(&self) -> Vec<TokenSource> {
        let mut sources = Vec::with_capacity(2);
        if self.authorization_header.enabled {
            sources.push(TokenSource::Header {
                name: self.authorization_header.name.clone(),
                prefix: self.authorization_header.prefix.clone(),
            });
        }
        if self.query_parameter.enabled {
            sources.push(TokenSource::QueryParameter {
                name: self.query_parameter.name.clone(),
            });
        }
        sources
    }

    /// Extractor chain for the enabled sources.
    #[must_use]
    pub fn extractor_chain(&self) -> ExtractorChain {
        ExtractorChain::from_sources(self.token_sources())
    }

    /// Build the token policy for these options and `keys`.
    ///
    /// # Errors
    ///
    /// Any error from [`GateConfig::validate`] or
    /// [`crate::TokenPolicyBuilder::build`].
    pub fn policy(&self, keys: KeySet) -> Result<TokenPolicy, ConfigError> {
        self.validate()?;

        let mut builder = TokenPolicy::builder()
            .algorithms(self.algorithms_allowed.iter().copied())
            .keys(keys)
            .clock_skew(self.clock_skew())
            .required_claims(self.required_claims.iter().cloned())
            .identity_claim(self.identity_claim.clone());
        if let Some(issuer) = &self.issuer {
            builder = builder.issuer(issuer.clone());
        }
        if let Some(audience) = &self.audience {
            builder = builder.audience(audience.clone());
        }
        Ok(builder.build()?)
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = vars.get(name) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        ))),
    }
}

fn parse_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
