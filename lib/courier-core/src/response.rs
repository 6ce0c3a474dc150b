//! HTTP response handling.
//!
//! [`Response`] gives access to status, headers, the streaming body, the
//! request that produced it, and the chain of prior responses that led to it.
//!
//! # Example
//!
//! ```ignore
//! let mut response = call.execute()?;
//! let user: User = response.take_body().expect("body").json()?;
//! ```

use std::time::SystemTime;

use bytes::Bytes;

use crate::{Error, Headers, Method, Protocol, Request, ResponseBody, Result, header};

/// TLS session details for a response received over a secure connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Negotiated protocol version, e.g. `TLSv1.3`.
    pub tls_version: String,
    /// Negotiated cipher suite.
    pub cipher_suite: String,
    /// Subject of the peer's leaf certificate, if one was presented.
    pub peer_principal: Option<String>,
}

/// HTTP response with status, headers, and a streaming body.
#[derive(Debug)]
pub struct Response {
    request: Request,
    protocol: Protocol,
    code: u16,
    message: String,
    headers: Headers,
    body: Option<ResponseBody>,
    handshake: Option<Handshake>,
    sent_request_at: SystemTime,
    received_response_at: SystemTime,
    prior_response: Option<Box<Response>>,
}

impl Response {
    /// Creates an empty [`ResponseBuilder`].
    #[must_use]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// The request that produced this response.
    ///
    /// This is the network request, or the user request once the bridge has
    /// unwrapped the response.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Protocol the response was received over.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// HTTP status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Reason phrase.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Last header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body, if it was not taken.
    #[must_use]
    pub const fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Takes the body, leaving `None` behind.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// TLS handshake, if the connection was secure.
    #[must_use]
    pub const fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    /// When the request headers were sent.
    #[must_use]
    pub const fn sent_request_at(&self) -> SystemTime {
        self.sent_request_at
    }

    /// When the response headers were received.
    #[must_use]
    pub const fn received_response_at(&self) -> SystemTime {
        self.received_response_at
    }

    /// The response that triggered the follow-up producing this one.
    ///
    /// Prior responses never carry a body.
    #[must_use]
    pub fn prior_response(&self) -> Option<&Self> {
        self.prior_response.as_deref()
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// Status is one of the redirect codes this client understands.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self.code, 300 | 301 | 302 | 303 | 307 | 308)
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Reads the whole body.
    pub fn bytes(mut self) -> Result<Bytes> {
        self.take_body().map_or_else(|| Ok(Bytes::new()), ResponseBody::bytes)
    }

    /// Reads the whole body as text.
    pub fn text(mut self) -> Result<String> {
        self.take_body()
            .map_or_else(|| Ok(String::new()), ResponseBody::string)
    }

    /// Reads the whole body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(mut self) -> Result<T> {
        self.take_body()
            .unwrap_or_else(ResponseBody::empty)
            .json()
    }

    /// Moves this response into a builder to derive a new one.
    #[must_use]
    pub fn new_builder(self) -> ResponseBuilder {
        ResponseBuilder {
            request: Some(self.request),
            protocol: self.protocol,
            code: Some(self.code),
            message: self.message,
            headers: self.headers,
            body: self.body,
            handshake: self.handshake,
            sent_request_at: self.sent_request_at,
            received_response_at: self.received_response_at,
            prior_response: self.prior_response,
            error: None,
        }
    }
}

/// Returns `true` if the response framing promises a body.
///
/// Responses to `HEAD` never have one. Informational, `204` and `304`
/// responses only do when they declare a length or chunked encoding anyway,
/// which is malformed but must still be read.
#[must_use]
pub fn has_body(response: &Response) -> bool {
    if response.request().method() == &Method::Head {
        return false;
    }

    let code = response.code();
    if !(100..200).contains(&code) && code != 204 && code != 304 {
        return true;
    }

    response.headers().content_length() != -1
        || response
            .header(header::TRANSFER_ENCODING.as_str())
            .is_some_and(|value| value.eq_ignore_ascii_case("chunked"))
}

/// Builder for [`Response`] values.
///
/// Header validation failures are kept and reported by [`ResponseBuilder::build`].
#[derive(Debug)]
pub struct ResponseBuilder {
    request: Option<Request>,
    protocol: Protocol,
    code: Option<u16>,
    message: String,
    headers: Headers,
    body: Option<ResponseBody>,
    handshake: Option<Handshake>,
    sent_request_at: SystemTime,
    received_response_at: SystemTime,
    prior_response: Option<Box<Response>>,
    error: Option<Error>,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            request: None,
            protocol: Protocol::default(),
            code: None,
            message: String::new(),
            headers: Headers::new(),
            body: None,
            handshake: None,
            sent_request_at: SystemTime::UNIX_EPOCH,
            received_response_at: SystemTime::UNIX_EPOCH,
            prior_response: None,
            error: None,
        }
    }
}

impl ResponseBuilder {
    /// Sets the request.
    #[must_use]
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the protocol.
    #[must_use]
    pub const fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the status code.
    #[must_use]
    pub const fn code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// The status code set so far.
    #[must_use]
    pub const fn code_value(&self) -> Option<u16> {
        self.code
    }

    /// Sets the reason phrase.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets a header, replacing any existing values.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Err(e) = self.headers.set(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Appends a header, keeping existing values.
    #[must_use]
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Err(e) = self.headers.add(name, value) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Removes every value of a header.
    #[must_use]
    pub fn remove_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the TLS handshake.
    #[must_use]
    pub fn handshake(mut self, handshake: Option<Handshake>) -> Self {
        self.handshake = handshake;
        self
    }

    /// Sets when the request headers were sent.
    #[must_use]
    pub const fn sent_request_at(mut self, at: SystemTime) -> Self {
        self.sent_request_at = at;
        self
    }

    /// Sets when the response headers were received.
    #[must_use]
    pub const fn received_response_at(mut self, at: SystemTime) -> Self {
        self.received_response_at = at;
        self
    }

    /// Links the response that triggered this one. Its body is dropped.
    #[must_use]
    pub fn prior_response(mut self, prior: Option<Response>) -> Self {
        self.prior_response = prior.map(|mut prior| {
            prior.body = None;
            Box::new(prior)
        });
        self
    }

    /// Builds the [`Response`].
    pub fn build(self) -> Result<Response> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let code = self
            .code
            .ok_or_else(|| Error::illegal_state("response code is missing"))?;
        let request = self
            .request
            .ok_or_else(|| Error::illegal_state("response request is missing"))?;

        Ok(Response {
            request,
            protocol: self.protocol,
            code,
            message: self.message,
            headers: self.headers,
            body: self.body,
            handshake: self.handshake,
            sent_request_at: self.sent_request_at,
            received_response_at: self.received_response_at,
            prior_response: self.prior_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn get(url: &str) -> Request {
        Request::get(url).expect("valid request")
    }

    fn response(code: u16) -> ResponseBuilder {
        Response::builder().request(get("http://a/")).code(code)
    }

    #[test]
    fn response_status_helpers() {
        let ok = response(200).build().expect("valid");
        check!(ok.is_success());
        check!(!ok.is_redirect());

        let moved = response(301).build().expect("valid");
        check!(moved.is_redirect());
        check!(!moved.is_success());

        check!(response(404).build().expect("valid").is_client_error());
        check!(response(503).build().expect("valid").is_server_error());
        check!(!response(304).build().expect("valid").is_redirect());
    }

    #[test]
    fn build_requires_code_and_request() {
        let_assert!(Err(Error::IllegalState(message)) = Response::builder().request(get("http://a/")).build());
        check!(message.contains("code"));

        let_assert!(Err(Error::IllegalState(message)) = Response::builder().code(200).build());
        check!(message.contains("request"));
    }

    #[test]
    fn prior_response_body_is_stripped() {
        let prior = response(302)
            .header("Location", "/b")
            .body(ResponseBody::from_bytes(None, "moved"))
            .build()
            .expect("valid");

        let response = response(200)
            .prior_response(Some(prior))
            .body(ResponseBody::empty())
            .build()
            .expect("valid");

        let_assert!(Some(prior) = response.prior_response());
        check!(prior.code() == 302);
        check!(prior.body().is_none());
        check!(prior.header("location") == Some("/b"));
    }

    #[test]
    fn new_builder_keeps_fields() {
        let original = response(201)
            .message("Created")
            .protocol(Protocol::Http10)
            .header("X-Id", "7")
            .body(ResponseBody::from_bytes(None, "payload"))
            .build()
            .expect("valid");

        let copy = original
            .new_builder()
            .remove_header("x-id")
            .build()
            .expect("valid");

        check!(copy.code() == 201);
        check!(copy.message() == "Created");
        check!(copy.protocol() == Protocol::Http10);
        check!(copy.header("X-Id").is_none());
        check!(copy.text().expect("text") == "payload");
    }

    #[test]
    fn take_body_leaves_none() {
        let mut response = response(200)
            .body(ResponseBody::from_bytes(None, "x"))
            .build()
            .expect("valid");
        check!(response.take_body().is_some());
        check!(response.body().is_none());
        check!(response.text().expect("text").is_empty());
    }

    #[test]
    fn has_body_framing_rule() {
        check!(has_body(&response(200).build().expect("valid")));
        check!(has_body(&response(404).build().expect("valid")));
        check!(!has_body(&response(204).build().expect("valid")));
        check!(!has_body(&response(304).build().expect("valid")));
        check!(!has_body(&response(100).build().expect("valid")));

        let chunked_204 = response(204)
            .header("Transfer-Encoding", "chunked")
            .build()
            .expect("valid");
        check!(has_body(&chunked_204));

        let sized_304 = response(304)
            .header("Content-Length", "3")
            .build()
            .expect("valid");
        check!(has_body(&sized_304));

        let head = Request::builder(url::Url::parse("http://a/").expect("url"))
            .head()
            .build()
            .expect("valid");
        let head_response = Response::builder()
            .request(head)
            .code(200)
            .header("Content-Length", "10")
            .build()
            .expect("valid");
        check!(!has_body(&head_response));
    }
}
