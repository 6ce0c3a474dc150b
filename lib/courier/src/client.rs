//! Client and its builder.

use std::sync::Arc;

use courier_core::{
    Authenticator, ConnectionProvider, CookieJar, NoAuthenticator, NoCookies, Proxy, Request,
    Response, Result,
};

use crate::call::Call;
use crate::chain::Interceptor;
use crate::config::ClientConfig;
#[cfg(feature = "middleware-basic-auth")]
use crate::middleware::BasicAuthenticator;
#[cfg(feature = "middleware-metrics")]
use crate::middleware::MetricsInterceptor;
use crate::middleware::{BearerAuthInterceptor, LoggingInterceptor};
use crate::stages::{
    BridgeInterceptor, CallServerInterceptor, ConnectInterceptor, FollowUpInterceptor,
};

/// Blocking HTTP client.
///
/// Cheap to clone; clones share the stage list and the connection provider.
///
/// # Example
///
/// ```ignore
/// use courier::{Client, Request};
///
/// let client = Client::builder(provider).with_logging().build();
/// let response = client.execute(Request::get("https://example.com/")?)?;
/// println!("{}", response.text()?);
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Arc<ClientConfig>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field(
                "stages",
                &self
                    .inner
                    .interceptors
                    .iter()
                    .map(|stage| stage.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Client {
    /// Create a builder over `provider`.
    #[must_use]
    pub fn builder(provider: impl ConnectionProvider + 'static) -> ClientBuilder {
        ClientBuilder::new(Arc::new(provider))
    }

    /// The configuration the stages read.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Prepares a call for `request`.
    #[must_use]
    pub fn new_call(&self, request: Request) -> Call {
        Call::new(Arc::clone(&self.inner.interceptors), request, false)
    }

    /// Prepares a protocol upgrade call. A `101 Switching Protocols`
    /// response is delivered with an empty body and the connection left to
    /// the caller's transport.
    #[must_use]
    pub fn new_upgrade_call(&self, request: Request) -> Call {
        Call::new(Arc::clone(&self.inner.interceptors), request, true)
    }

    /// Executes `request` on the current thread.
    pub fn execute(&self, request: Request) -> Result<Response> {
        self.new_call(request).execute()
    }
}

/// Builder for [`Client`].
///
/// Interceptors run in the order they are added: first added = outermost.
pub struct ClientBuilder {
    provider: Arc<dyn ConnectionProvider>,
    config: ClientConfig,
    cookie_jar: Arc<dyn CookieJar>,
    authenticator: Arc<dyn Authenticator>,
    proxy_authenticator: Arc<dyn Authenticator>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    network_interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("interceptors_count", &self.interceptors.len())
            .field("network_interceptors_count", &self.network_interceptors.len())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder over a shared provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            config: ClientConfig::default(),
            cookie_jar: Arc::new(NoCookies),
            authenticator: Arc::new(NoAuthenticator),
            proxy_authenticator: Arc::new(NoAuthenticator),
            interceptors: Vec::new(),
            network_interceptors: Vec::new(),
        }
    }

    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set whether to retry on connection failures.
    #[must_use]
    pub const fn retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.config.retry_on_connection_failure = retry;
        self
    }

    /// Set whether to follow redirects.
    #[must_use]
    pub const fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set whether to follow redirects between `http` and `https`.
    #[must_use]
    pub const fn follow_ssl_redirects(mut self, follow: bool) -> Self {
        self.config.follow_ssl_redirects = follow;
        self
    }

    /// Set the default `User-Agent`.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.config.proxy = proxy;
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Set the cookie jar.
    #[must_use]
    pub fn cookie_jar(mut self, jar: impl CookieJar + 'static) -> Self {
        self.cookie_jar = Arc::new(jar);
        self
    }

    /// Set the authenticator answering `401` responses.
    #[must_use]
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    /// Set the authenticator answering `407` responses.
    #[must_use]
    pub fn proxy_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.proxy_authenticator = Arc::new(authenticator);
        self
    }

    // ========================================================================
    // Interceptors
    // ========================================================================

    /// Add an application interceptor. It runs once per call, sees the
    /// caller's request and the final response.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add a network interceptor. It runs once per exchange, sees the
    /// request as written to the wire and must call `proceed` exactly once.
    #[must_use]
    pub fn network_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.network_interceptors.push(Arc::new(interceptor));
        self
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Add request/response logging at info level.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.interceptor(LoggingInterceptor::new())
    }

    /// Add request/response logging at debug level, headers included.
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.interceptor(LoggingInterceptor::debug())
    }

    /// Add `Authorization: Bearer <token>` to requests without credentials.
    #[must_use]
    pub fn with_bearer_auth(self, token: impl Into<String>) -> Self {
        self.interceptor(BearerAuthInterceptor::new(token))
    }

    /// Answer `Basic` challenges with the given credentials.
    #[cfg(feature = "middleware-basic-auth")]
    #[must_use]
    pub fn with_basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        self.authenticator(BasicAuthenticator::new(username, password))
    }

    /// Record call metrics through the `metrics` facade.
    #[cfg(feature = "middleware-metrics")]
    #[must_use]
    pub fn with_metrics(self) -> Self {
        self.interceptor(MetricsInterceptor::new())
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let config = Arc::new(self.config);

        let mut interceptors = self.interceptors;
        interceptors.push(Arc::new(FollowUpInterceptor::new(
            self.provider,
            self.authenticator,
            self.proxy_authenticator,
            Arc::clone(&config),
        )));
        interceptors.push(Arc::new(BridgeInterceptor::new(
            self.cookie_jar,
            config.user_agent.clone(),
        )));
        interceptors.push(Arc::new(ConnectInterceptor));
        interceptors.extend(self.network_interceptors);
        interceptors.push(Arc::new(CallServerInterceptor));

        Client {
            inner: Arc::new(ClientInner {
                config,
                interceptors: Arc::from(interceptors),
            }),
        }
    }
}
