//! Test requests
//!
//! Builds `http::Request<()>` values, which implement
//! `bearer_gate::RequestParts`, without the boilerplate of the http builder.

/// Builder for test requests
///
/// # Example
/// ```rust,ignore
/// let request = TestRequest::new().bearer(&token).build();
/// let result = gate.authenticate(&request);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestRequest {
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    /// Request for `/`
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            ..Self::default()
        }
    }

    /// Set the request path
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Add `Authorization: Bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {token}"))
    }

    /// Add an arbitrary header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter (form-urlencoded on build)
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Build the request
    pub fn build(self) -> http::Request<()> {
        let mut uri = self.path;
        if !self.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            uri.push('?');
            uri.push_str(&query);
        }

        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(()).expect("test request should build")
    }
}
