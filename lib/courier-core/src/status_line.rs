//! Response status line parsing and serialization.
//!
//! Accepts `HTTP/1.0`, `HTTP/1.1` and the legacy SHOUTcast `ICY` prefix.

use std::fmt;

use derive_more::Display;

use crate::response::ResponseBuilder;
use crate::{Error, Result};

/// Wire protocol a response was received over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Protocol {
    /// HTTP/1.0.
    #[display("http/1.0")]
    Http10,
    /// HTTP/1.1.
    #[default]
    #[display("http/1.1")]
    Http11,
    /// HTTP/2.
    #[display("h2")]
    Http2,
}

/// A parsed `HTTP/1.1 200 OK` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Protocol version.
    pub protocol: Protocol,
    /// Three-digit status code.
    pub code: u16,
    /// Reason phrase, possibly empty.
    pub message: String,
}

impl StatusLine {
    /// Parses a status line such as `HTTP/1.1 404 Not Found`.
    pub fn parse(line: &str) -> Result<Self> {
        let unexpected = || Error::protocol(format!("Unexpected status line: {line}"));

        let (protocol, code_start) = if let Some(rest) = line.strip_prefix("HTTP/1.") {
            if line.len() < 9 || line.as_bytes().get(8) != Some(&b' ') {
                return Err(unexpected());
            }
            match rest.as_bytes().first() {
                Some(b'0') => (Protocol::Http10, 9),
                Some(b'1') => (Protocol::Http11, 9),
                _ => return Err(unexpected()),
            }
        } else if line.starts_with("ICY ") {
            (Protocol::Http10, 4)
        } else {
            return Err(unexpected());
        };

        let code_end = code_start + 3;
        let digits = line.get(code_start..code_end).ok_or_else(unexpected)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unexpected());
        }
        let code = digits.parse::<u16>().map_err(|_| unexpected())?;

        let message = match line.get(code_end..) {
            None | Some("") => String::new(),
            Some(tail) => tail
                .strip_prefix(' ')
                .ok_or_else(unexpected)?
                .to_string(),
        };

        Ok(Self {
            protocol,
            code,
            message,
        })
    }

    /// Copies protocol, code and message onto a response builder.
    #[must_use]
    pub fn apply_to(&self, builder: ResponseBuilder) -> ResponseBuilder {
        builder
            .protocol(self.protocol)
            .code(self.code)
            .message(self.message.clone())
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = if self.protocol == Protocol::Http10 {
            "HTTP/1.0"
        } else {
            "HTTP/1.1"
        };
        write!(f, "{version} {}", self.code)?;
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn parse_http11_with_message() {
        let line = StatusLine::parse("HTTP/1.1 404 Not Found").expect("valid");
        check!(line.protocol == Protocol::Http11);
        check!(line.code == 404);
        check!(line.message == "Not Found");
    }

    #[test]
    fn parse_http10_without_message() {
        let line = StatusLine::parse("HTTP/1.0 204").expect("valid");
        check!(line.protocol == Protocol::Http10);
        check!(line.code == 204);
        check!(line.message.is_empty());
    }

    #[test]
    fn parse_trailing_space_gives_empty_message() {
        let line = StatusLine::parse("HTTP/1.1 200 ").expect("valid");
        check!(line.message.is_empty());
    }

    #[test]
    fn parse_icy_as_http10() {
        let line = StatusLine::parse("ICY 200 OK").expect("valid");
        check!(line.protocol == Protocol::Http10);
        check!(line.code == 200);
        check!(line.message == "OK");
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        for line in [
            "",
            "HTTP/1.2 200 OK",
            "HTTP/2.0 200 OK",
            "HTTP/1.1200 OK",
            "HTTP/1.1 2x0 OK",
            "HTTP/1.1 20",
            "HTTP/1.1 200OK",
            "SPDY/3 200 OK",
        ] {
            let_assert!(Err(Error::Protocol(message)) = StatusLine::parse(line));
            check!(message.starts_with("Unexpected status line"));
        }
    }

    #[test]
    fn display_round_trips() {
        for line in ["HTTP/1.1 200 OK", "HTTP/1.0 500 Internal Server Error", "HTTP/1.1 204"] {
            check!(StatusLine::parse(line).expect("valid").to_string() == line);
        }
    }

    #[test]
    fn display_uses_http11_for_http2() {
        let line = StatusLine {
            protocol: Protocol::Http2,
            code: 100,
            message: "Continue".to_string(),
        };
        check!(line.to_string() == "HTTP/1.1 100 Continue");
    }
}
