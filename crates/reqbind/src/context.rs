//! Request representation consumed by the binder.
//!
//! The [`RequestContext`] holds the already-parsed parts of an HTTP request:
//! URI, headers, collected body and the router's path captures.

use crate::Params;
use bytes::Bytes;
use http::{HeaderMap, Uri};

/// The parts of an HTTP request a binder reads from.
///
/// # Example
///
/// ```rust
/// use reqbind::{Params, RequestContext};
/// use http::{HeaderMap, Uri};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "123");
///
/// let ctx = RequestContext::new(
///     Uri::from_static("/users/123?active=true"),
///     HeaderMap::new(),
///     Bytes::new(),
///     params,
/// );
///
/// assert_eq!(ctx.query_string(), Some("active=true"));
/// assert_eq!(ctx.path_params().get("id"), Some("123"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
}

impl RequestContext {
    /// Creates a new request context.
    #[must_use]
    pub fn new(
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: Params,
    ) -> Self {
        Self {
            uri,
            headers,
            body,
            path_params,
        }
    }

    /// Returns a builder for a request to `/`.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::new()
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the router's path captures.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns the `Content-Type` header value if it is valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl From<http::Request<Bytes>> for RequestContext {
    /// Converts a collected request. Path captures are taken from the
    /// request extensions when a router stored a [`Params`] there.
    fn from(request: http::Request<Bytes>) -> Self {
        let (mut parts, body) = request.into_parts();
        let path_params = parts.extensions.remove::<Params>().unwrap_or_default();
        Self::new(parts.uri, parts.headers, body, path_params)
    }
}

/// Builder for constructing a [`RequestContext`].
#[derive(Debug)]
pub struct RequestContextBuilder {
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
}

impl Default for RequestContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: Params::new(),
        }
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Parses and sets the URI. Unparseable input leaves the URI unchanged.
    #[must_use]
    pub fn uri_str(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = uri;
        }
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a single path capture.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the request context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext::new(self.uri, self.headers, self.body, self.path_params)
    }
}
