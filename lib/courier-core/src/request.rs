//! HTTP request building.
//!
//! A [`Request`] is an immutable value. Changing one means copying it into a
//! [`RequestBuilder`] with [`Request::new_builder`], overriding fields, and
//! building a new value.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, Request, RequestBody};
//!
//! let url = "https://api.example.com/users".parse().expect("valid URL");
//! let request = Request::builder(url)
//!     .header("Accept", "application/json")
//!     .method(Method::Post, Some(RequestBody::text("hello")))
//!     .build()
//!     .expect("valid request");
//!
//! assert_eq!(request.method(), &Method::Post);
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use url::Url;

use crate::{Error, Headers, Method, RequestBody, Result};

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<RequestBody>,
}

impl Request {
    /// Creates a new [`RequestBuilder`] for a `GET` to `url`.
    #[must_use]
    pub fn builder(url: Url) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    /// Shorthand for a body-less `GET`.
    pub fn get(url: &str) -> Result<Self> {
        Self::builder(Url::parse(url)?).build()
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` if the URL scheme is `https`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Last header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Returns `true` if the body is absent or can be sent again.
    #[must_use]
    pub fn is_repeatable(&self) -> bool {
        self.body.as_ref().is_none_or(RequestBody::is_repeatable)
    }

    /// Copies this request into a builder.
    #[must_use]
    pub fn new_builder(&self) -> RequestBuilder {
        RequestBuilder {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            error: None,
        }
    }
}

/// Builder for constructing [`Request`] instances.
///
/// Header validation failures are kept and reported by [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<RequestBody>,
    error: Option<Error>,
}

impl RequestBuilder {
    /// Creates a builder for a body-less `GET`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Headers::new(),
            body: None,
            error: None,
        }
    }

    /// Sets the target URL.
    #[must_use]
    pub fn url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets a header, replacing any existing values.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Err(e) = self.headers.set(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Appends a header, keeping existing values.
    #[must_use]
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Err(e) = self.headers.add(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Removes every value of a header.
    #[must_use]
    pub fn remove_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the method and body together.
    #[must_use]
    pub fn method(mut self, method: Method, body: Option<RequestBody>) -> Self {
        self.method = method;
        self.body = body;
        self
    }

    /// Body-less `GET`.
    #[must_use]
    pub fn get(self) -> Self {
        self.method(Method::Get, None)
    }

    /// Body-less `HEAD`.
    #[must_use]
    pub fn head(self) -> Self {
        self.method(Method::Head, None)
    }

    /// `POST` with a body.
    #[must_use]
    pub fn post(self, body: RequestBody) -> Self {
        self.method(Method::Post, Some(body))
    }

    /// `PUT` with a body.
    #[must_use]
    pub fn put(self, body: RequestBody) -> Self {
        self.method(Method::Put, Some(body))
    }

    /// `PATCH` with a body.
    #[must_use]
    pub fn patch(self, body: RequestBody) -> Self {
        self.method(Method::Patch, Some(body))
    }

    /// `DELETE` with an optional body.
    #[must_use]
    pub fn delete(self, body: Option<RequestBody>) -> Self {
        self.method(Method::Delete, body)
    }

    /// Builds the [`Request`].
    ///
    /// Fails if a header was invalid, if the method forbids the body that was
    /// given, or if the method requires a body that is missing.
    pub fn build(self) -> Result<Request> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match (&self.body, &self.method) {
            (Some(_), method) if !method.permits_request_body() => {
                return Err(Error::invalid_request(format!(
                    "method {method} must not have a request body."
                )));
            }
            (None, method) if method.requires_request_body() => {
                return Err(Error::invalid_request(format!(
                    "method {method} must have a request body."
                )));
            }
            _ => {}
        }
        Ok(Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        })
    }
}
