//! Core types and collaborator contracts for the courier HTTP call pipeline.
//!
//! This crate provides the values the pipeline passes around and the traits
//! it consumes from the connection layer:
//! - [`Request`] and [`RequestBuilder`] - immutable HTTP requests
//! - [`Response`] and [`ResponseBuilder`] - immutable HTTP responses with a prior-response chain
//! - [`RequestBody`] and [`ResponseBody`] - repeatable or one-shot payloads
//! - [`Headers`] - ordered, case-insensitive header multimap
//! - [`StatusLine`] - status line parsing for codecs
//! - [`ConnectionProvider`], [`StreamAllocation`], [`HttpCodec`] - transport contracts
//! - [`CookieJar`] and [`Authenticator`] - cookie and credential collaborators
//! - [`Error`] and [`Result`] - error handling
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod address;
mod auth;
mod body;
mod cookie;
mod error;
mod headers;
mod method;
pub mod prelude;
mod request;
mod response;
mod status_line;
mod transport;

pub use address::{Address, Proxy, ProxyKind, Route, host_header};
pub use auth::{Authenticator, Challenge, NoAuthenticator, challenges};
pub use body::{ContentType, RequestBody, ResponseBody, from_json, to_form, to_json};
pub use cookie::{Cookie, CookieJar, NoCookies};
pub use error::{Error, Result, RouteError, TransportError, TransportErrorKind};
pub use headers::{Headers, header};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{Handshake, Response, ResponseBuilder, has_body};
pub use status_line::{Protocol, StatusLine};
pub use transport::{AbortHandle, ConnectionInfo, ConnectionProvider, HttpCodec, StreamAllocation};

// Re-export url so callers build requests with the same version
pub use url::Url;
