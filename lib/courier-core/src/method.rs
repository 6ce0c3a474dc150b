//! HTTP method types.
//!
//! Besides the usual verbs, the pipeline needs a few `WebDAV` methods to
//! decide what a redirect does with the request body.

use std::str::FromStr;

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - retrieve a resource.
    #[display("GET")]
    Get,
    /// HEAD method - retrieve headers only.
    #[display("HEAD")]
    Head,
    /// POST method - create a resource.
    #[display("POST")]
    Post,
    /// PUT method - replace a resource.
    #[display("PUT")]
    Put,
    /// DELETE method - remove a resource.
    #[display("DELETE")]
    Delete,
    /// PATCH method - partially update a resource.
    #[display("PATCH")]
    Patch,
    /// OPTIONS method - retrieve allowed methods.
    #[display("OPTIONS")]
    Options,
    /// TRACE method - loop-back test.
    #[display("TRACE")]
    Trace,
    /// CONNECT method - establish a tunnel.
    #[display("CONNECT")]
    Connect,
    /// `WebDAV` PROPFIND.
    #[display("PROPFIND")]
    PropFind,
    /// `WebDAV` PROPPATCH.
    #[display("PROPPATCH")]
    PropPatch,
    /// `WebDAV` REPORT.
    #[display("REPORT")]
    Report,
    /// Any other valid method token.
    #[display("{_0}")]
    Extension(http::Method),
}

impl Method {
    /// Returns `true` if the method is safe (does not modify resources).
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options | Self::Trace)
    }

    /// Returns `true` if the method is idempotent.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Self::Get | Self::Head | Self::Options | Self::Trace | Self::Put | Self::Delete
        )
    }

    /// Returns `true` if a request with this method may carry a body.
    #[must_use]
    pub const fn permits_request_body(&self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }

    /// Returns `true` if a request with this method must carry a body.
    #[must_use]
    pub const fn requires_request_body(&self) -> bool {
        matches!(
            self,
            Self::Post | Self::Put | Self::Patch | Self::PropPatch | Self::Report
        )
    }

    /// Returns `true` if a redirect keeps both method and body.
    #[must_use]
    pub const fn redirects_with_body(&self) -> bool {
        matches!(self, Self::PropFind)
    }

    /// Returns `true` if a redirect rewrites the request to a body-less GET.
    #[must_use]
    pub const fn redirects_to_get(&self) -> bool {
        !matches!(self, Self::PropFind)
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        http::Method::from_bytes(token.as_bytes())
            .map(Self::from)
            .map_err(|_| crate::Error::invalid_request(format!("invalid HTTP method: {token:?}")))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Head => Self::HEAD,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Patch => Self::PATCH,
            Method::Options => Self::OPTIONS,
            Method::Trace => Self::TRACE,
            Method::Connect => Self::CONNECT,
            Method::PropFind => Self::from_bytes(b"PROPFIND").unwrap_or(Self::GET),
            Method::PropPatch => Self::from_bytes(b"PROPPATCH").unwrap_or(Self::GET),
            Method::Report => Self::from_bytes(b"REPORT").unwrap_or(Self::GET),
            Method::Extension(other) => other,
        }
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        match method {
            http::Method::GET => Self::Get,
            http::Method::HEAD => Self::Head,
            http::Method::POST => Self::Post,
            http::Method::PUT => Self::Put,
            http::Method::DELETE => Self::Delete,
            http::Method::PATCH => Self::Patch,
            http::Method::OPTIONS => Self::Options,
            http::Method::TRACE => Self::Trace,
            http::Method::CONNECT => Self::Connect,
            other => match other.as_str() {
                "PROPFIND" => Self::PropFind,
                "PROPPATCH" => Self::PropPatch,
                "REPORT" => Self::Report,
                _ => Self::Extension(other),
            },
        }
    }
}
