//! Client configuration types.

use courier_core::Proxy;

/// Follow-ups allowed per call before it fails with
/// [`Error::TooManyFollowUps`](crate::Error::TooManyFollowUps).
pub const MAX_FOLLOW_UPS: usize = 20;

/// Policy settings read by the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Whether to retry transport failures on another route, and re-issue
    /// requests answered with `408 Request Timeout`.
    pub retry_on_connection_failure: bool,
    /// Whether to follow `3xx` redirects.
    pub follow_redirects: bool,
    /// Whether redirects may switch between `http` and `https`.
    pub follow_ssl_redirects: bool,
    /// Default `User-Agent` header.
    pub user_agent: String,
    /// Proxy used to reach every address.
    pub proxy: Proxy,
    /// Follow-ups allowed per call.
    pub max_follow_ups: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_on_connection_failure: true,
            follow_redirects: true,
            follow_ssl_redirects: true,
            user_agent: concat!("courier/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: Proxy::Direct,
            max_follow_ups: MAX_FOLLOW_UPS,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    retry_on_connection_failure: Option<bool>,
    follow_redirects: Option<bool>,
    follow_ssl_redirects: Option<bool>,
    user_agent: Option<String>,
    proxy: Option<Proxy>,
    max_follow_ups: Option<usize>,
}

impl ClientConfigBuilder {
    /// Set whether to retry on connection failures.
    #[must_use]
    pub const fn retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.retry_on_connection_failure = Some(retry);
        self
    }

    /// Set whether to follow redirects.
    #[must_use]
    pub const fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Set whether to follow redirects between `http` and `https`.
    #[must_use]
    pub const fn follow_ssl_redirects(mut self, follow: bool) -> Self {
        self.follow_ssl_redirects = Some(follow);
        self
    }

    /// Set the default `User-Agent`.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set the follow-up limit.
    #[must_use]
    pub const fn max_follow_ups(mut self, max: usize) -> Self {
        self.max_follow_ups = Some(max);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            retry_on_connection_failure: self
                .retry_on_connection_failure
                .unwrap_or(defaults.retry_on_connection_failure),
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            follow_ssl_redirects: self
                .follow_ssl_redirects
                .unwrap_or(defaults.follow_ssl_redirects),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            proxy: self.proxy.unwrap_or(defaults.proxy),
            max_follow_ups: self.max_follow_ups.unwrap_or(defaults.max_follow_ups),
        }
    }
}
