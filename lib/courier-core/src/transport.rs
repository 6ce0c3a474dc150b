//! Contracts for the connection layer the call pipeline runs on.
//!
//! The pipeline never opens sockets itself. A [`ConnectionProvider`] hands out
//! one [`StreamAllocation`] per target [`Address`], and each allocation opens
//! [`HttpCodec`]s that move request and response bytes.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::{Address, Error, Handshake, Request, Response, ResponseBody, ResponseBuilder, Result, Route};

/// Hands out connection allocations.
///
/// Shared by every call of a client, so implementations synchronize
/// internally.
pub trait ConnectionProvider: Send + Sync {
    /// Claims a connection allocation for `address`.
    fn acquire(&self, address: &Address) -> Result<Box<dyn StreamAllocation>>;
}

/// A claim on a reusable connection for one [`Address`].
///
/// Owned by exactly one call at a time. It must be released on every exit
/// path.
pub trait StreamAllocation: Send {
    /// Connects if needed and opens a codec for `request`.
    ///
    /// Fails with [`Error::Route`] when no route could be connected.
    fn new_stream(&mut self, request: &Request) -> Result<Box<dyn HttpCodec>>;

    /// Returns `true` while a codec opened by this allocation is still
    /// exchanging, e.g. its response body was not fully read.
    fn has_open_stream(&self) -> bool;

    /// The connection currently held, if any.
    fn connection(&self) -> Option<ConnectionInfo>;

    /// The route of the current connection, if any.
    fn route(&self) -> Option<Route>;

    /// Returns `true` if untried routes remain.
    fn has_more_routes(&self) -> bool;

    /// Reports that the current stream failed, so its route can be
    /// penalized.
    fn stream_failed(&mut self, error: Option<&Error>);

    /// Forbids new streams on the current connection.
    fn no_new_streams(&mut self);

    /// Gives the allocation back to the provider.
    fn release(&mut self);

    /// A handle that aborts in-flight I/O from any thread.
    fn abort_handle(&self) -> AbortHandle;
}

/// Reads and writes one HTTP exchange over an allocated connection.
pub trait HttpCodec: Send {
    /// Writes the request line and headers.
    fn write_request_headers(&mut self, request: &Request) -> Result<()>;

    /// Opens a sink for the request body. `-1` means unknown length.
    fn create_request_body(
        &mut self,
        request: &Request,
        content_length: i64,
    ) -> Result<Box<dyn Write + '_>>;

    /// Flushes buffered request bytes to the transport.
    fn flush_request(&mut self) -> Result<()>;

    /// Signals the end of the request.
    fn finish_request(&mut self) -> Result<()>;

    /// Reads the status line and headers.
    ///
    /// With `expect_continue`, returns `Ok(None)` when the peer answered
    /// `100 Continue` and the body should be sent.
    fn read_response_headers(&mut self, expect_continue: bool) -> Result<Option<ResponseBuilder>>;

    /// Opens the response body for streaming.
    fn open_response_body(&mut self, response: &Response) -> Result<ResponseBody>;

    /// Aborts the exchange. Called when the call is canceled after the
    /// request was sent and before its response is read.
    fn cancel(&mut self);
}

/// What the pipeline may know about a live connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// TLS handshake, if the connection is secure.
    pub handshake: Option<Handshake>,
    /// Returns `true` if the connection carries concurrent streams.
    pub multiplexed: bool,
}

/// Aborts in-flight I/O of an allocation.
#[derive(Clone)]
pub struct AbortHandle(Arc<dyn Fn() + Send + Sync>);

impl AbortHandle {
    /// Wraps an abort function.
    #[must_use]
    pub fn new(abort: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(abort))
    }

    /// A handle that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Aborts.
    pub fn abort(&self) {
        (self.0)();
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}
