//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Authenticator, ContentType, Cookie, CookieJar, Error, Headers, Method, Request,
    RequestBody, RequestBuilder, Response, ResponseBody, Result, Url,
};
