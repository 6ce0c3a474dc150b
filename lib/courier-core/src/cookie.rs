//! Cookie store contract.

use std::fmt;

use url::Url;

use crate::Headers;

/// A cookie as sent in a request's `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    /// Creates a cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses the `name=value` pair of a `Set-Cookie` header, ignoring its
    /// attributes.
    #[must_use]
    pub fn parse(set_cookie: &str) -> Option<Self> {
        let pair = set_cookie.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value.trim()))
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Supplies cookies for outgoing requests and receives them from responses.
pub trait CookieJar: Send + Sync {
    /// Cookies to send with a request to `url`.
    fn load_for_request(&self, url: &Url) -> Vec<Cookie>;

    /// Offers the headers of a response from `url` for storage.
    fn save_from_response(&self, url: &Url, headers: &Headers);
}

/// A jar that never stores nor sends cookies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCookies;

impl CookieJar for NoCookies {
    fn load_for_request(&self, _url: &Url) -> Vec<Cookie> {
        Vec::new()
    }

    fn save_from_response(&self, _url: &Url, _headers: &Headers) {}
}
