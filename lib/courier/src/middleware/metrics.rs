//! Metrics interceptor using the metrics crate facade.
//!
//! Records HTTP call metrics using the `metrics` crate, which allows
//! integration with various metrics backends (Prometheus, `StatsD`, etc.).

use std::time::Instant;

use courier_core::{Response, Result};

use crate::chain::{Chain, Interceptor};

/// Labels used for metrics.
const LABEL_METHOD: &str = "method";
const LABEL_STATUS: &str = "status";

/// Metric names.
const METRIC_REQUESTS_TOTAL: &str = "http_client_requests_total";
const METRIC_REQUEST_DURATION: &str = "http_client_request_duration_seconds";
const METRIC_REQUESTS_IN_FLIGHT: &str = "http_client_requests_in_flight";

/// Interceptor that records HTTP metrics.
///
/// Records the following metrics:
/// - `http_client_requests_total` (counter): Total number of calls, labeled by method and status
/// - `http_client_request_duration_seconds` (histogram): Call duration in seconds
/// - `http_client_requests_in_flight` (gauge): Number of calls currently in flight
///
/// As an application interceptor it measures whole calls, follow-ups
/// included. As a network interceptor it measures each exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsInterceptor {
    _private: (),
}

impl MetricsInterceptor {
    /// Create a new metrics interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Interceptor for MetricsInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let request = chain.request().clone();
        let method = request.method().to_string();
        let start = Instant::now();

        metrics::gauge!(METRIC_REQUESTS_IN_FLIGHT).increment(1.0);
        let result = chain.proceed(request);
        metrics::gauge!(METRIC_REQUESTS_IN_FLIGHT).decrement(1.0);

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!(METRIC_REQUEST_DURATION, LABEL_METHOD => method.clone())
            .record(duration);

        let status = match &result {
            Ok(response) => response.code().to_string(),
            Err(_) => "error".to_string(),
        };
        metrics::counter!(
            METRIC_REQUESTS_TOTAL,
            LABEL_METHOD => method,
            LABEL_STATUS => status
        )
        .increment(1);

        result
    }
}
