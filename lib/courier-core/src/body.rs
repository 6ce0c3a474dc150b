//! Request and response bodies.
//!
//! A [`RequestBody`] is either repeatable bytes or a one-shot stream. A
//! [`ResponseBody`] is always a streaming reader; an empty sentinel stands in
//! where there is nothing to read.

use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::{Error, Result, TransportErrorKind};

/// Common content types for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain; charset=utf-8`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Request Body
// ============================================================================

type SharedReader = Arc<Mutex<Option<Box<dyn Read + Send>>>>;

#[derive(Clone)]
enum BodySource {
    Bytes(Bytes),
    Stream(SharedReader),
}

/// The payload of a request.
///
/// Cloning a streamed body shares the underlying reader, so only one of the
/// clones can ever be written.
#[derive(Clone)]
pub struct RequestBody {
    content_type: Option<String>,
    content_length: i64,
    source: BodySource,
}

impl RequestBody {
    /// A repeatable body backed by bytes.
    #[must_use]
    pub fn from_bytes(content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_type: content_type.map(str::to_string),
            content_length: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            source: BodySource::Bytes(bytes),
        }
    }

    /// A repeatable UTF-8 text body.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_bytes(Some(ContentType::PlainText.as_str()), text.into())
    }

    /// A repeatable JSON body.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        let bytes = to_json(value)?;
        Ok(Self::from_bytes(Some(ContentType::Json.as_str()), bytes))
    }

    /// A repeatable form URL-encoded body.
    pub fn form<T: serde::Serialize>(value: &T) -> Result<Self> {
        let bytes = to_form(value)?;
        Ok(Self::from_bytes(
            Some(ContentType::FormUrlEncoded.as_str()),
            bytes,
        ))
    }

    /// A one-shot body read from `reader` when the request is transmitted.
    ///
    /// Use `-1` as `content_length` when the length is unknown; the request
    /// is then sent with chunked transfer encoding.
    #[must_use]
    pub fn stream(
        content_type: Option<&str>,
        content_length: i64,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            content_length: content_length.max(-1),
            source: BodySource::Stream(Arc::new(Mutex::new(Some(Box::new(reader))))),
        }
    }

    /// Declared media type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared length in bytes, `-1` if unknown.
    #[must_use]
    pub const fn content_length(&self) -> i64 {
        self.content_length
    }

    /// Returns `true` if the body can be transmitted more than once.
    #[must_use]
    pub const fn is_repeatable(&self) -> bool {
        matches!(self.source, BodySource::Bytes(_))
    }

    /// Writes the body to `sink`.
    ///
    /// Failures reading the body source are reported as
    /// [`TransportErrorKind::BodySource`], failures writing to the sink as
    /// [`TransportErrorKind::Write`].
    pub fn write_to(&self, sink: &mut dyn Write) -> Result<()> {
        match &self.source {
            BodySource::Bytes(bytes) => sink
                .write_all(bytes)
                .map_err(|e| Error::transport(TransportErrorKind::Write, e)),
            BodySource::Stream(shared) => {
                let mut reader = shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                    .ok_or_else(|| {
                        Error::transport(
                            TransportErrorKind::BodySource,
                            io::Error::other("streamed request body was already consumed"),
                        )
                    })?;
                copy_classified(&mut reader, sink)
            }
        }
    }
}

fn copy_classified(reader: &mut dyn Read, sink: &mut dyn Write) -> Result<()> {
    let mut buffer = [0_u8; 8 * 1024];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::transport(TransportErrorKind::BodySource, e)),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        sink.write_all(chunk)
            .map_err(|e| Error::transport(TransportErrorKind::Write, e))?;
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("repeatable", &self.is_repeatable())
            .finish()
    }
}

// ============================================================================
// Response Body
// ============================================================================

/// The payload of a response, read as a stream.
pub struct ResponseBody {
    content_type: Option<String>,
    content_length: i64,
    source: Box<dyn Read + Send>,
}

impl ResponseBody {
    /// A body streaming from `source`.
    #[must_use]
    pub fn new(
        content_type: Option<String>,
        content_length: i64,
        source: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_type,
            content_length: content_length.max(-1),
            source: Box::new(source),
        }
    }

    /// A body backed by in-memory bytes.
    #[must_use]
    pub fn from_bytes(content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let content_length = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        Self::new(
            content_type.map(str::to_string),
            content_length,
            Cursor::new(bytes),
        )
    }

    /// The zero-length sentinel.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_bytes(None, Bytes::new())
    }

    /// Declared media type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared length in bytes, `-1` if unknown.
    #[must_use]
    pub const fn content_length(&self) -> i64 {
        self.content_length
    }

    /// Reads the whole body into memory.
    pub fn bytes(mut self) -> Result<Bytes> {
        let mut buffer = Vec::new();
        self.source
            .read_to_end(&mut buffer)
            .map_err(|e| Error::transport(TransportErrorKind::Read, e))?;
        Ok(Bytes::from(buffer))
    }

    /// Reads the whole body as UTF-8 text, replacing invalid sequences.
    pub fn string(self) -> Result<String> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads and deserializes the whole body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes()?;
        from_json(&bytes)
    }

    /// Consumes the body into its raw reader.
    #[must_use]
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.source
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use courier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
