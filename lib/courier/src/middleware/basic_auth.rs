//! Basic authentication.
//!
//! Answers `Basic` challenges with `Authorization: Basic <base64(user:pass)>`,
//! or `Proxy-Authorization` for a `407`.

use std::sync::Arc;

use base64::Engine;
use courier_core::{Authenticator, Request, Response, Result, Route, challenges};
use tracing::debug;

/// Authenticator answering `Basic` challenges with fixed credentials.
///
/// Gives up when the rejected request already carried the same credentials,
/// so a wrong password does not loop until the follow-up limit.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::BasicAuthenticator;
///
/// let client = Client::builder(provider)
///     .authenticator(BasicAuthenticator::new("username", "password"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BasicAuthenticator {
    /// "Basic " followed by base64-encoded "username:password".
    credential: Arc<str>,
}

impl BasicAuthenticator {
    /// Create a new basic authenticator with the given username and password.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            credential: Arc::from(format!("Basic {encoded}")),
        }
    }
}

impl Authenticator for BasicAuthenticator {
    fn authenticate(&self, _route: Option<&Route>, response: &Response) -> Result<Option<Request>> {
        let header = if response.code() == 407 {
            "Proxy-Authorization"
        } else {
            "Authorization"
        };

        if response.request().header(header) == Some(&*self.credential) {
            debug!(status = response.code(), "credentials were rejected, giving up");
            return Ok(None);
        }

        let offers_basic = challenges(response)
            .iter()
            .any(|challenge| challenge.scheme().eq_ignore_ascii_case("basic"));
        if !offers_basic {
            return Ok(None);
        }

        response
            .request()
            .new_builder()
            .header(header, &*self.credential)
            .build()
            .map(Some)
    }
}
