//! Retry and follow-up controller.
//!
//! The outermost built-in stage. It acquires a connection allocation, runs the
//! rest of the chain over it, recovers from transport failures on another
//! route, and turns redirects, authentication challenges and retryable
//! timeouts into follow-up requests until a final response arrives.

use std::sync::Arc;

use courier_core::{
    Address, Authenticator, ConnectionProvider, Error, Method, ProxyKind, Request, Response,
    Result, Route, StreamAllocation, TransportErrorKind, Url, header,
};
use tracing::{debug, warn};

use crate::call::CallContext;
use crate::chain::{Chain, Interceptor};
use crate::config::ClientConfig;

/// What a response asks for, keyed by status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpRule {
    /// `407`: answer the proxy's challenge.
    ProxyAuthenticate,
    /// `401`: answer the origin's challenge.
    Authenticate,
    /// `307`, `308`: redirect, but only `GET` and `HEAD`.
    TemporaryRedirect,
    /// `300` to `303`: redirect.
    Redirect,
    /// `408`: the server gave up waiting, send the request again.
    RequestTimeout,
    /// `503`: retry only when told to retry immediately.
    ServiceUnavailable,
    /// Final response.
    Final,
}

impl FollowUpRule {
    /// The rule for a status code.
    #[must_use]
    pub const fn for_status(code: u16) -> Self {
        match code {
            407 => Self::ProxyAuthenticate,
            401 => Self::Authenticate,
            307 | 308 => Self::TemporaryRedirect,
            300..=303 => Self::Redirect,
            408 => Self::RequestTimeout,
            503 => Self::ServiceUnavailable,
            _ => Self::Final,
        }
    }
}

/// Stage that retries failures and follows up responses.
pub struct FollowUpInterceptor {
    provider: Arc<dyn ConnectionProvider>,
    authenticator: Arc<dyn Authenticator>,
    proxy_authenticator: Arc<dyn Authenticator>,
    config: Arc<ClientConfig>,
}

impl FollowUpInterceptor {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        authenticator: Arc<dyn Authenticator>,
        proxy_authenticator: Arc<dyn Authenticator>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            provider,
            authenticator,
            proxy_authenticator,
            config,
        }
    }

    fn acquire<'c>(&self, url: &Url, call: &'c CallContext) -> Result<AllocationLease<'c>> {
        let address = Address::from_url(url, &self.config.proxy)?;
        let allocation = self.provider.acquire(&address)?;
        debug!(%address, "acquired connection allocation");
        call.register_abort(allocation.abort_handle());
        Ok(AllocationLease {
            allocation,
            address,
            call,
            released: false,
        })
    }

    /// Decides whether a failed attempt may be retried over `allocation`.
    fn recover(
        &self,
        error: &Error,
        allocation: &mut dyn StreamAllocation,
        request: &Request,
    ) -> bool {
        let send_started = match error {
            Error::Route(_) => false,
            Error::Transport(transport) => transport.request_send_started(),
            _ => return false,
        };

        allocation.stream_failed(Some(error));

        if !self.config.retry_on_connection_failure {
            return false;
        }

        if send_started
            && (!request.is_repeatable()
                || error.transport_kind() == Some(TransportErrorKind::BodySource))
        {
            return false;
        }

        if !is_recoverable(error, send_started) {
            return false;
        }

        allocation.has_more_routes()
    }

    /// The request that answers `response`, or `None` if it is final.
    pub fn follow_up_request(
        &self,
        response: &Response,
        route: Option<&Route>,
    ) -> Result<Option<Request>> {
        let request = response.request();
        let code = response.code();

        match FollowUpRule::for_status(code) {
            FollowUpRule::ProxyAuthenticate => {
                let proxy_kind = route.map_or_else(|| self.config.proxy.kind(), |r| r.proxy().kind());
                if proxy_kind != ProxyKind::Http {
                    return Err(Error::protocol(
                        "Received HTTP_PROXY_AUTH (407) code while not using proxy",
                    ));
                }
                self.proxy_authenticator.authenticate(route, response)
            }

            FollowUpRule::Authenticate => self.authenticator.authenticate(route, response),

            FollowUpRule::TemporaryRedirect => {
                // Body-bearing methods are never redirected automatically.
                if !matches!(request.method(), Method::Get | Method::Head) {
                    return Ok(None);
                }
                self.redirect(response)
            }

            FollowUpRule::Redirect => self.redirect(response),

            FollowUpRule::RequestTimeout => {
                if !self.config.retry_on_connection_failure || !request.is_repeatable() {
                    return Ok(None);
                }
                if response.prior_response().is_some_and(|prior| prior.code() == 408) {
                    return Ok(None);
                }
                if retry_after(response, 0) > 0 {
                    return Ok(None);
                }
                Ok(Some(request.clone()))
            }

            FollowUpRule::ServiceUnavailable => {
                if response.prior_response().is_some_and(|prior| prior.code() == 503) {
                    return Ok(None);
                }
                if retry_after(response, i32::MAX) == 0 {
                    return Ok(Some(request.clone()));
                }
                Ok(None)
            }

            FollowUpRule::Final => Ok(None),
        }
    }

    fn redirect(&self, response: &Response) -> Result<Option<Request>> {
        if !self.config.follow_redirects {
            return Ok(None);
        }

        let request = response.request();
        let Some(location) = response.header(header::LOCATION.as_str()) else {
            return Ok(None);
        };
        let Some(url) = resolve_redirect_url(request.url(), location) else {
            return Ok(None);
        };

        let same_scheme = url.scheme() == request.url().scheme();
        if !same_scheme && !self.config.follow_ssl_redirects {
            return Ok(None);
        }

        let method = request.method();
        let mut builder = request.new_builder();
        if method.permits_request_body() {
            let maintain_body = method.redirects_with_body();
            builder = if method.redirects_to_get() {
                builder.get()
            } else {
                let body = if maintain_body {
                    request.body().cloned()
                } else {
                    None
                };
                builder.method(method.clone(), body)
            };
            if !maintain_body {
                builder = builder
                    .remove_header(header::TRANSFER_ENCODING.as_str())
                    .remove_header(header::CONTENT_LENGTH.as_str())
                    .remove_header(header::CONTENT_TYPE.as_str());
            }
        }

        // Credentials never follow a redirect to another authority.
        if !same_connection(request.url(), &url) {
            builder = builder.remove_header(header::AUTHORIZATION.as_str());
        }

        builder.url(url).build().map(Some)
    }
}

impl Interceptor for FollowUpInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let call = chain.call();
        let mut request = chain.request().clone();
        let mut lease = self.acquire(request.url(), call)?;
        let mut follow_up_count = 0_usize;
        let mut prior_response: Option<Response> = None;

        loop {
            if call.is_canceled() {
                return Err(Error::Canceled);
            }

            let mut response =
                match chain.proceed_with_allocation(request.clone(), lease.allocation.as_mut()) {
                    Ok(response) => response,
                    Err(error) => {
                        if call.is_canceled() {
                            return Err(Error::Canceled);
                        }
                        if self.recover(&error, lease.allocation.as_mut(), &request) {
                            debug!(%error, "recovering from failure on another route");
                            continue;
                        }
                        return Err(error);
                    }
                };

            if let Some(prior) = prior_response.take() {
                response = response.new_builder().prior_response(Some(prior)).build()?;
            }

            let route = lease.allocation.route();
            let Some(follow_up) = self.follow_up_request(&response, route.as_ref())? else {
                lease.release();
                return Ok(response);
            };

            // Closes the body so the connection can be reused.
            drop(response.take_body());

            follow_up_count += 1;
            if follow_up_count > self.config.max_follow_ups {
                warn!(count = follow_up_count, "too many follow-up requests");
                return Err(Error::TooManyFollowUps {
                    count: follow_up_count,
                });
            }

            if !follow_up.is_repeatable() {
                return Err(Error::UnrepeatableBody {
                    status: response.code(),
                });
            }

            debug!(
                status = response.code(),
                method = %follow_up.method(),
                url = %follow_up.url(),
                count = follow_up_count,
                "following up"
            );

            if !lease.address.same_authority(follow_up.url()) {
                lease.release();
                lease = self.acquire(follow_up.url(), call)?;
            } else if lease.allocation.has_open_stream() {
                return Err(Error::illegal_state(format!(
                    "Closing the body of the {} response didn't close its backing stream. Bad interceptor?",
                    response.code()
                )));
            }

            request = follow_up;
            prior_response = Some(response);
        }
    }
}

impl std::fmt::Debug for FollowUpInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowUpInterceptor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An allocation owned by one call, released on every exit path.
struct AllocationLease<'c> {
    allocation: Box<dyn StreamAllocation>,
    address: Address,
    call: &'c CallContext,
    released: bool,
}

impl AllocationLease<'_> {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.call.clear_abort();
            self.allocation.release();
            debug!(address = %self.address, "released connection allocation");
        }
    }
}

impl Drop for AllocationLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.allocation.stream_failed(None);
        }
        self.release();
    }
}

fn is_recoverable(error: &Error, send_started: bool) -> bool {
    // A timeout while connecting can be retried on another route; once the
    // request is in flight it cannot.
    if error.transport_kind() == Some(TransportErrorKind::Timeout) {
        return !send_started;
    }
    error.is_retryable_kind()
}

/// Parses `Retry-After` as whole seconds.
///
/// Absent returns `default`. Any value that is not all digits (an HTTP date,
/// say) returns `i32::MAX`.
#[must_use]
pub fn retry_after(response: &Response, default: i32) -> i32 {
    match response.header(header::RETRY_AFTER.as_str()) {
        None => default,
        Some(value) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
            value.parse().unwrap_or(i32::MAX)
        }
        Some(_) => i32::MAX,
    }
}

fn resolve_redirect_url(base: &Url, location: &str) -> Option<Url> {
    let url = Url::parse(location).or_else(|_| base.join(location)).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn same_connection(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && a.scheme() == b.scheme()
}
