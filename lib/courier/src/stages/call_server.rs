//! The last stage: one request/response exchange over a codec.

use std::io::{self, Write};
use std::time::SystemTime;

use courier_core::{
    Error, Request, Response, ResponseBody, ResponseBuilder, Result, TransportErrorKind, header,
};
use tracing::debug;

use crate::chain::{Chain, Interceptor};

/// Stage that writes the request and reads the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallServerInterceptor;

impl Interceptor for CallServerInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let request = chain.request().clone();
        let call = chain.call();
        let upgrade = call.is_upgrade();
        let (allocation, codec) = chain.connection_parts()?;

        let sent_request_at = SystemTime::now();
        codec.write_request_headers(&request)?;

        let mut interim: Option<ResponseBuilder> = None;
        if let Some(body) = request.body()
            && request.method().permits_request_body()
        {
            // Wait for "100 Continue" before sending the body. A final
            // response instead means the server declined it.
            if expects_continue(&request) {
                codec.flush_request()?;
                interim = codec.read_response_headers(true)?;
            }

            if interim.is_none() {
                let mut sink = codec.create_request_body(&request, body.content_length())?;
                let mut counting = CountingWriter::new(&mut sink);
                let result = body.write_to(&mut counting).and_then(|()| {
                    counting
                        .flush()
                        .map_err(|e| Error::transport(TransportErrorKind::Write, e))
                });
                debug!(bytes = counting.written(), "request body written");
                result?;
            } else if !allocation.connection().is_some_and(|c| c.multiplexed) {
                // The body was never sent, the connection is unusable.
                allocation.no_new_streams();
            }
        }

        codec.finish_request()?;

        if call.is_canceled() {
            debug!("call canceled before the response was read");
            codec.cancel();
            return Err(Error::Canceled);
        }

        let builder = match interim {
            Some(builder) => builder,
            None => read_final_headers(codec.read_response_headers(false)?)?,
        };
        let handshake = allocation.connection().and_then(|c| c.handshake);

        let mut response = builder
            .request(request.clone())
            .handshake(handshake.clone())
            .sent_request_at(sent_request_at)
            .received_response_at(SystemTime::now())
            .build()?;

        if response.code() == 100 {
            // An unsolicited "100 Continue": the real response follows.
            debug!("skipping unsolicited 100 Continue");
            response = read_final_headers(codec.read_response_headers(false)?)?
                .request(request.clone())
                .handshake(handshake)
                .sent_request_at(sent_request_at)
                .received_response_at(SystemTime::now())
                .build()?;
        }

        let code = response.code();
        let body = if upgrade && code == 101 {
            ResponseBody::empty()
        } else {
            codec.open_response_body(&response)?
        };
        let response = response.new_builder().body(body).build()?;

        if is_close(response.request().header(header::CONNECTION.as_str()))
            || is_close(response.header(header::CONNECTION.as_str()))
        {
            allocation.no_new_streams();
        }

        let content_length = response.body().map_or(-1, ResponseBody::content_length);
        if (code == 204 || code == 205) && content_length > 0 {
            return Err(Error::protocol(format!(
                "HTTP {code} had non-zero Content-Length: {content_length}"
            )));
        }

        Ok(response)
    }
}

fn expects_continue(request: &Request) -> bool {
    request
        .header(header::EXPECT.as_str())
        .is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
}

fn is_close(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("close"))
}

fn read_final_headers(builder: Option<ResponseBuilder>) -> Result<ResponseBuilder> {
    builder.ok_or_else(|| Error::protocol("codec returned no response headers"))
}

/// Counts the bytes that reached the sink, even when a later write fails.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    const fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_writer_counts_partial_writes() {
        let mut sink = Vec::new();
        let mut counting = CountingWriter::new(&mut sink);
        counting.write_all(b"hello").expect("write");
        counting.write_all(b" world").expect("write");
        assert_eq!(counting.written(), 11);
        assert_eq!(sink, b"hello world");
    }

    #[test]
    fn connection_close_detection() {
        assert!(is_close(Some("close")));
        assert!(is_close(Some("Close")));
        assert!(!is_close(Some("keep-alive")));
        assert!(!is_close(None));
    }

    #[test]
    fn expect_continue_detection() {
        let request = Request::get("http://a/")
            .expect("valid")
            .new_builder()
            .header("Expect", "100-Continue")
            .build()
            .expect("valid");
        assert!(expects_continue(&request));
        assert!(!expects_continue(&Request::get("http://a/").expect("valid")));
    }
}
