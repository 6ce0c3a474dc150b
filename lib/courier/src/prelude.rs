//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    Call, Chain, Client, ClientBuilder, ClientConfig, ConnectionProvider, Error, Interceptor,
    Method, Request, RequestBody, Response, ResponseBody, Result, Url, interceptor_fn,
};
