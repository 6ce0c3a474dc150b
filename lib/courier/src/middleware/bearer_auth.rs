//! Bearer token authentication interceptor.
//!
//! Adds an `Authorization: Bearer <token>` header to requests that carry no
//! credentials of their own.

use std::sync::Arc;

use courier_core::{Response, Result};

use crate::chain::{Chain, Interceptor};

/// Interceptor that adds bearer token authentication to requests.
///
/// Runs once per call as an application interceptor, so redirects to
/// another host still drop the header.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::BearerAuthInterceptor;
///
/// let client = Client::builder(provider)
///     .interceptor(BearerAuthInterceptor::new("my-secret-token"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuthInterceptor {
    token: Arc<str>,
}

impl BearerAuthInterceptor {
    /// Create a new bearer auth interceptor with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }
}

impl Interceptor for BearerAuthInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let request = chain.request();
        if request.header("Authorization").is_some() {
            let request = request.clone();
            return chain.proceed(request);
        }

        let request = request
            .new_builder()
            .header("Authorization", format!("Bearer {}", self.token))
            .build()?;
        chain.proceed(request)
    }
}
