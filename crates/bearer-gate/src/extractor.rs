//! Token extractors and the ordered extractor chain.
//!
//! An extractor looks in one place of a request for a candidate token. The
//! chain asks each extractor in declaration order and the first non-empty
//! candidate wins. Extractors never fail: a header that is present but
//! malformed (wrong prefix, extra spaces) is simply "not found" so the next
//! extractor still gets a chance.
//!
//! Passing tokens in query strings leaks them into access logs and browser
//! history; the query-parameter extractor is therefore disabled by default in
//! [`crate::config::GateConfig`] and logs at `info` when it supplies a token.

use crate::error::NotFound;
use crate::request::RequestParts;
use crate::token::RawToken;
use std::fmt;

/// Default header carrying the token.
pub const DEFAULT_HEADER_NAME: &str = "Authorization";

/// Default authorization scheme prefix.
pub const DEFAULT_HEADER_PREFIX: &str = "Bearer";

/// Default query parameter carrying the token.
pub const DEFAULT_QUERY_PARAMETER: &str = "bearer";

/// A single token source.
pub trait TokenExtractor: Send + Sync + fmt::Debug {
    /// Return the candidate token, or `None` if this source has none.
    fn extract(&self, request: &dyn RequestParts) -> Option<RawToken>;
}

/// Declarative description of a token source, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Named header with an authorization scheme prefix.
    Header {
        /// Header name.
        name: String,
        /// Scheme prefix, matched case-sensitively. Empty means no prefix.
        prefix: String,
    },
    /// Named query parameter.
    QueryParameter {
        /// Parameter name.
        name: String,
    },
}

impl TokenSource {
    /// Build the extractor for this source.
    #[must_use]
    pub fn into_extractor(self) -> Box<dyn TokenExtractor> {
        match self {
            TokenSource::Header { name, prefix } => {
                Box::new(AuthorizationHeaderExtractor::new(name, prefix))
            }
            TokenSource::QueryParameter { name } => Box::new(QueryParameterExtractor::new(name)),
        }
    }
}

/// Extracts `<prefix> <token>` from a header.
#[derive(Debug, Clone)]
pub struct AuthorizationHeaderExtractor {
    header_name: String,
    prefix: String,
}

impl AuthorizationHeaderExtractor {
    /// Create an extractor for `header_name` expecting `prefix`.
    #[must_use]
    pub fn new(header_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            prefix: prefix.into(),
        }
    }

    /// Header name this extractor reads.
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Scheme prefix this extractor expects.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for AuthorizationHeaderExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_NAME, DEFAULT_HEADER_PREFIX)
    }
}

impl TokenExtractor for AuthorizationHeaderExtractor {
    fn extract(&self, request: &dyn RequestParts) -> Option<RawToken> {
        let value = request.header(&self.header_name)?;

        let candidate = if self.prefix.is_empty() {
            value
        } else {
            let Some(rest) = value
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_prefix(' '))
            else {
                tracing::debug!(
                    target: "bearer_gate.extractor",
                    header = %self.header_name,
                    "Header present but scheme prefix does not match"
                );
                return None;
            };
            rest
        };

        // Exactly "<prefix> <token>": anything with further spaces is malformed
        if candidate.contains(' ') {
            tracing::debug!(
                target: "bearer_gate.extractor",
                header = %self.header_name,
                "Header value has unexpected extra segments"
            );
            return None;
        }

        RawToken::new(candidate)
    }
}

/// Extracts the token from a query parameter.
#[derive(Debug, Clone)]
pub struct QueryParameterExtractor {
    name: String,
}

impl QueryParameterExtractor {
    /// Create an extractor for the query parameter `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Parameter name this extractor reads.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for QueryParameterExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_PARAMETER)
    }
}

impl TokenExtractor for QueryParameterExtractor {
    fn extract(&self, request: &dyn RequestParts) -> Option<RawToken> {
        let token = RawToken::new(request.query_param(&self.name)?.into_owned())?;
        tracing::info!(
            target: "bearer_gate.extractor",
            parameter = %self.name,
            "Bearer token supplied via query parameter"
        );
        Some(token)
    }
}

/// Ordered list of extractors, assembled once at startup.
#[derive(Debug, Default)]
pub struct ExtractorChain {
    extractors: Vec<Box<dyn TokenExtractor>>,
}

impl ExtractorChain {
    /// Empty chain. An empty chain never finds a token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from sources, preserving their order.
    #[must_use]
    pub fn from_sources(sources: impl IntoIterator<Item = TokenSource>) -> Self {
        Self {
            extractors: sources
                .into_iter()
                .map(TokenSource::into_extractor)
                .collect(),
        }
    }

    /// Append an extractor at the lowest priority.
    #[must_use]
    pub fn with(mut self, extractor: impl TokenExtractor + 'static) -> Self {
        self.push(Box::new(extractor));
        self
    }

    /// Append an extractor at the lowest priority.
    pub fn push(&mut self, extractor: Box<dyn TokenExtractor>) {
        self.extractors.push(extractor);
    }

    /// Number of extractors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether the chain has no extractors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Ask each extractor in order; the first candidate wins.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] when no extractor yields a token.
    pub fn extract(&self, request: &dyn RequestParts) -> Result<RawToken, NotFound> {
        self.extractors
            .iter()
            .find_map(|extractor| extractor.extract(request))
            .ok_or(NotFound)
    }
}
