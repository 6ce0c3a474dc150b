//! Blocking HTTP call pipeline.
//!
//! A [`Client`] runs every request through a fixed list of [`Interceptor`]s:
//! the caller's application interceptors, the built-in follow-up, bridge and
//! connect stages, the caller's network interceptors, and finally the stage
//! that talks to the server. Connections come from a
//! [`ConnectionProvider`] supplied by the caller.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let client = Client::builder(provider)
//!     .with_logging()
//!     .with_bearer_auth("my-token")
//!     .build();
//!
//! let request = Request::get("https://api.example.com/users/42")?;
//! let user: User = client.execute(request)?.json()?;
//! ```
//!
//! Calls can be canceled from another thread:
//!
//! ```ignore
//! let call = client.new_call(request);
//! let canceller = call.canceller();
//! std::thread::spawn(move || canceller.cancel());
//! let result = call.execute(); // Err(Error::Canceled) if canceled in time
//! ```

mod call;
mod chain;
mod client;
mod config;
pub mod middleware;
pub mod prelude;
pub mod stages;

pub use call::{Call, CallContext, Canceller};
pub use chain::{Chain, FnInterceptor, Interceptor, interceptor_fn};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, MAX_FOLLOW_UPS};

// Re-export core types
pub use courier_core::{
    AbortHandle, Address, Authenticator, Challenge, ConnectionInfo, ConnectionProvider,
    ContentType, Cookie, CookieJar, Error, Handshake, Headers, HttpCodec, Method,
    NoAuthenticator, NoCookies, Protocol, Proxy, ProxyKind, Request, RequestBody, RequestBuilder,
    Response, ResponseBody, ResponseBuilder, Result, Route, RouteError, StatusLine,
    StreamAllocation, TransportError, TransportErrorKind, challenges, from_json, has_body,
    host_header, to_form, to_json,
};

// Re-export http header names
pub use courier_core::header;

// Re-export url so callers build requests with the same version
pub use courier_core::Url;
