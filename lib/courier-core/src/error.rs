//! Error types for courier.
//!
//! Failures are split the way the call pipeline needs to classify them:
//! transport failures (possibly retryable), route failures, protocol
//! violations, policy rejections, and cancellation.

use std::io;

use derive_more::{Display, Error, From};

// ============================================================================
// Transport Errors
// ============================================================================

/// What went wrong while talking to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TransportErrorKind {
    /// Could not open a connection to the route.
    #[display("connect")]
    Connect,
    /// Failed while reading from the transport.
    #[display("read")]
    Read,
    /// Failed while writing to the transport.
    #[display("write")]
    Write,
    /// A socket-level timeout elapsed.
    #[display("timeout")]
    Timeout,
    /// A blocking wait was interrupted.
    #[display("interrupted")]
    Interrupted,
    /// The connection was shut down before the request was transmitted.
    #[display("connection shutdown")]
    ConnectionShutdown,
    /// TLS negotiation failed.
    #[display("tls handshake")]
    TlsHandshake,
    /// The peer certificate was rejected by the trust manager.
    #[display("tls certificate")]
    TlsCertificate,
    /// The peer could not be verified (hostname mismatch, pinning failure).
    #[display("tls peer unverified")]
    TlsPeerUnverified,
    /// The request body source could not be read.
    #[display("request body source")]
    BodySource,
    /// Anything else.
    #[display("other")]
    Other,
}

impl TransportErrorKind {
    /// Best-effort mapping from an [`io::ErrorKind`].
    #[must_use]
    pub fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::Interrupted => Self::Interrupted,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NotConnected => Self::Connect,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => Self::Read,
            io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero => Self::Write,
            io::ErrorKind::NotFound => Self::BodySource,
            _ => Self::Other,
        }
    }
}

/// An I/O failure raised by the transport or the codec.
#[derive(Debug, Display, Error)]
#[display("{kind} failure: {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    source: io::Error,
}

impl TransportError {
    /// Creates a transport error of the given kind.
    #[must_use]
    pub fn new(kind: TransportErrorKind, source: io::Error) -> Self {
        Self { kind, source }
    }

    /// Creates a transport error, deriving the kind from the I/O error.
    #[must_use]
    pub fn from_io(source: io::Error) -> Self {
        Self {
            kind: TransportErrorKind::from_io(source.kind()),
            source,
        }
    }

    /// The failure kind.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// The underlying I/O error.
    #[must_use]
    pub const fn io_error(&self) -> &io::Error {
        &self.source
    }

    /// Whether the request may have reached the peer.
    ///
    /// Only a connection shut down before transmission guarantees it did not.
    #[must_use]
    pub fn request_send_started(&self) -> bool {
        self.kind != TransportErrorKind::ConnectionShutdown
    }
}

/// Every route to an address failed.
#[derive(Debug, Display, Error)]
#[display("failed to connect to any route: {first}")]
pub struct RouteError {
    #[error(not(source))]
    first: TransportError,
    #[error(not(source))]
    last: Option<TransportError>,
}

impl RouteError {
    /// Creates a route error from a single connect failure.
    #[must_use]
    pub const fn new(first: TransportError) -> Self {
        Self { first, last: None }
    }

    /// Records a further connect failure while trying the next route.
    #[must_use]
    pub fn with_attempt(mut self, failure: TransportError) -> Self {
        self.last = Some(failure);
        self
    }

    /// The first connect failure.
    #[must_use]
    pub const fn first(&self) -> &TransportError {
        &self.first
    }

    /// The most recent connect failure.
    #[must_use]
    pub fn last(&self) -> &TransportError {
        self.last.as_ref().unwrap_or(&self.first)
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The exchange failed mid-flight at the transport level.
    #[display("{_0}")]
    #[from]
    Transport(TransportError),

    /// No route to the target authority could be established.
    #[display("{_0}")]
    #[from]
    Route(RouteError),

    /// The peer or an interceptor broke the HTTP protocol.
    #[display("protocol violation: {_0}")]
    #[from(skip)]
    Protocol(#[error(not(source))] String),

    /// Internal consistency or interceptor chain discipline was broken.
    #[display("illegal state: {_0}")]
    #[from(skip)]
    IllegalState(#[error(not(source))] String),

    /// The follow-up limit was exceeded.
    #[display("too many follow-up requests: {count}")]
    #[from(skip)]
    TooManyFollowUps {
        /// Number of follow-ups attempted, including the rejected one.
        count: usize,
    },

    /// A follow-up required re-sending a one-shot body.
    #[display("cannot retry streamed HTTP body (status {status})")]
    #[from(skip)]
    UnrepeatableBody {
        /// Status code of the response that asked for the follow-up.
        status: u16,
    },

    /// The call was canceled.
    #[display("canceled")]
    #[from(skip)]
    Canceled,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error of the given kind.
    #[must_use]
    pub fn transport(kind: TransportErrorKind, source: io::Error) -> Self {
        Self::Transport(TransportError::new(kind, source))
    }

    /// Create a transport error classified from the I/O error kind.
    #[must_use]
    pub fn io(source: io::Error) -> Self {
        Self::Transport(TransportError::from_io(source))
    }

    /// Create a protocol violation.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create an illegal state error.
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns `true` if this is a protocol violation.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Returns `true` if this is a policy rejection.
    #[must_use]
    pub const fn is_policy(&self) -> bool {
        matches!(self, Self::TooManyFollowUps { .. } | Self::UnrepeatableBody { .. })
    }

    /// Returns `true` if this is a transport or route failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Route(_))
    }

    /// Returns `true` if the failure kind alone does not rule out a retry.
    ///
    /// Interrupted waits and rejected TLS peers never succeed on another
    /// route. Whether a timeout is retryable depends on whether the request
    /// was sent, which the caller decides.
    #[must_use]
    pub fn is_retryable_kind(&self) -> bool {
        self.transport_kind().is_some_and(|kind| {
            !matches!(
                kind,
                TransportErrorKind::Interrupted
                    | TransportErrorKind::TlsCertificate
                    | TransportErrorKind::TlsPeerUnverified
            )
        })
    }

    /// The transport failure kind, if any.
    ///
    /// For route failures this is the kind of the most recent attempt.
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(error) => Some(error.kind()),
            Self::Route(error) => Some(error.last().kind()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::io(error)
    }
}
