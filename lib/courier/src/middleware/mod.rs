//! Ready-made interceptors.
//!
//! Add them with [`ClientBuilder::interceptor`](crate::ClientBuilder::interceptor)
//! or through the builder helpers. Application interceptors run once per
//! call, before follow-ups are handled.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-basic-auth` | [`BasicAuthenticator`] and `.with_basic_auth()` |
//! | `middleware-metrics` | [`MetricsInterceptor`] and `.with_metrics()` |
//!
//! # Example
//!
//! ```ignore
//! use courier::Client;
//!
//! let client = Client::builder(provider)
//!     .with_bearer_auth("my-token")
//!     .with_logging()
//!     .build();
//! ```

#[cfg(feature = "middleware-basic-auth")]
mod basic_auth;
mod bearer_auth;
mod logging;
#[cfg(feature = "middleware-metrics")]
mod metrics;

#[cfg(feature = "middleware-basic-auth")]
pub use basic_auth::BasicAuthenticator;
pub use bearer_auth::BearerAuthInterceptor;
pub use logging::{LogLevel, LoggingInterceptor};
#[cfg(feature = "middleware-metrics")]
pub use metrics::MetricsInterceptor;
