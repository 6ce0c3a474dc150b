//! Request/response logging interceptor.
//!
//! Logs calls using the `tracing` crate.

use std::time::Instant;

use courier_core::{Response, Result};
use tracing::{Level, debug, info, span, warn};

use crate::chain::{Chain, Interceptor};

/// Interceptor that logs each request and its outcome.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::LoggingInterceptor;
///
/// let client = Client::builder(provider)
///     .interceptor(LoggingInterceptor::debug())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor {
    level: LogLevel,
}

/// Log level for the logging interceptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging interceptor that logs at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let request = chain.request().clone();
        let method = request.method();
        let url = request.url();

        let span = span!(Level::INFO, "http_request", %method, %url);
        let _entered = span.enter();

        match self.level {
            LogLevel::Debug => {
                debug!(headers = %request.headers(), "sending request");
            }
            LogLevel::Info => {
                info!("sending request");
            }
        }

        let start = Instant::now();
        let result = chain.proceed(request.clone());

        // Saturating conversion to u64 (truncates after ~584 million years)
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => {
                let status = response.code();
                let follow_ups = std::iter::successors(response.prior_response(), |prior| {
                    prior.prior_response()
                })
                .count();
                if response.is_success() {
                    info!(status, follow_ups, elapsed_ms, "request completed");
                } else {
                    warn!(status, follow_ups, elapsed_ms, "request failed with HTTP error");
                }
                if self.level == LogLevel::Debug {
                    debug!(headers = %response.headers(), "response headers");
                }
            }
            Err(error) => {
                warn!(%error, elapsed_ms, "request failed");
            }
        }

        result
    }
}
