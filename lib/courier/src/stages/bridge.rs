//! Bridges application requests to network requests.
//!
//! Fills in the headers the wire needs (`Host`, framing, `Connection`,
//! cookies, `User-Agent`) and undoes transparent gzip on the way back.

use std::sync::Arc;

use courier_core::{
    CookieJar, Error, Response, ResponseBody, Result, has_body, host_header,
};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::chain::{Chain, Interceptor};

/// Stage translating between application and network requests.
pub struct BridgeInterceptor {
    cookie_jar: Arc<dyn CookieJar>,
    user_agent: String,
}

impl BridgeInterceptor {
    /// Creates the stage.
    #[must_use]
    pub fn new(cookie_jar: Arc<dyn CookieJar>, user_agent: impl Into<String>) -> Self {
        Self {
            cookie_jar,
            user_agent: user_agent.into(),
        }
    }
}

impl Interceptor for BridgeInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let user_request = chain.request().clone();
        let mut builder = user_request.new_builder();

        if let Some(body) = user_request.body() {
            if let Some(content_type) = body.content_type()
                && user_request.header("Content-Type").is_none()
            {
                builder = builder.header("Content-Type", content_type);
            }

            let content_length = body.content_length();
            builder = if content_length == -1 {
                builder
                    .header("Transfer-Encoding", "chunked")
                    .remove_header("Content-Length")
            } else {
                builder
                    .header("Content-Length", content_length.to_string())
                    .remove_header("Transfer-Encoding")
            };
        }

        if user_request.header("Host").is_none() {
            builder = builder.header("Host", host_header(user_request.url()));
        }

        if user_request.header("Connection").is_none() {
            builder = builder.header("Connection", "Keep-Alive");
        }

        // Asking for gzip means decompressing the response too. A range
        // request addresses bytes of the encoded entity, so it is left alone.
        let transparent_gzip = user_request
            .header("Accept-Encoding")
            .is_none()
            && user_request.header("Range").is_none();
        if transparent_gzip {
            builder = builder.header("Accept-Encoding", "gzip");
        }

        let cookies = self.cookie_jar.load_for_request(user_request.url());
        if !cookies.is_empty() {
            let cookie_header = cookies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header("Cookie", cookie_header);
        }

        if user_request.header("User-Agent").is_none() {
            builder = builder.header("User-Agent", self.user_agent.as_str());
        }

        let mut network_response = chain.proceed(builder.build()?)?;

        self.cookie_jar
            .save_from_response(user_request.url(), network_response.headers());

        let gzipped = network_response
            .header("Content-Encoding")
            .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"));

        if transparent_gzip && gzipped && has_body(&network_response) {
            debug!(url = %user_request.url(), "decompressing gzip response body");
            let content_type = network_response
                .header("Content-Type")
                .map(str::to_string);
            let encoded = network_response
                .take_body()
                .ok_or_else(|| Error::illegal_state("network response has no body"))?;
            let decoded = ResponseBody::new(content_type, -1, GzDecoder::new(encoded));

            return network_response
                .new_builder()
                .remove_header("Content-Encoding")
                .remove_header("Content-Length")
                .body(decoded)
                .request(user_request)
                .build();
        }

        network_response.new_builder().request(user_request).build()
    }
}

impl std::fmt::Debug for BridgeInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeInterceptor")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
