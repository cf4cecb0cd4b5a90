//! Request capability consumed by token extractors.
//!
//! Extractors never see a concrete request type, only this trait, so the core
//! stays independent of any web framework. Implementations are provided for
//! `http::Request<B>` and `http::request::Parts`, which covers axum, hyper and
//! tower based hosts.

use std::borrow::Cow;

/// Read-only view of the parts of a request that can carry a bearer token.
pub trait RequestParts {
    /// Value of the first header with this name (case-insensitive).
    ///
    /// Values that are not visible ASCII are reported as absent.
    fn header(&self, name: &str) -> Option<&str>;

    /// Percent-decoded value of the first query parameter with this name.
    fn query_param(&self, name: &str) -> Option<Cow<'_, str>>;
}

fn header_value<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn query_value<'a>(uri: &'a http::Uri, name: &str) -> Option<Cow<'a, str>> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

impl<B> RequestParts for http::Request<B> {
    fn header(&self, name: &str) -> Option<&str> {
        header_value(self.headers(), name)
    }

    fn query_param(&self, name: &str) -> Option<Cow<'_, str>> {
        query_value(self.uri(), name)
    }
}

impl RequestParts for http::request::Parts {
    fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    fn query_param(&self, name: &str) -> Option<Cow<'_, str>> {
        query_value(&self.uri, name)
    }
}
