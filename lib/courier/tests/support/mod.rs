//! Scripted in-memory transport for driving real clients.
//!
//! A [`MockServer`] is a `ConnectionProvider` answering exchanges from a queue
//! of [`Step`]s and recording everything the pipeline asks of it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor, Write};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use courier::{
    AbortHandle, Address, ConnectionInfo, ConnectionProvider, Error, Handshake, Headers,
    HttpCodec, Request, Response, ResponseBody, ResponseBuilder, Result, Route, RouteError,
    StreamAllocation, TransportError, TransportErrorKind,
};

/// A scripted answer to one exchange.
#[derive(Debug, Clone)]
pub struct Reply {
    code: u16,
    message: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    interim_continue: bool,
    decline_continue: bool,
}

impl Reply {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            message: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
            interim_continue: false,
            decline_continue: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the body and a matching `Content-Length`.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let length = self.body.len().to_string();
        self.header("Content-Length", &length)
    }

    /// Sends an unsolicited `100 Continue` before the final headers.
    pub fn with_interim_continue(mut self) -> Self {
        self.interim_continue = true;
        self
    }

    /// Answers `Expect: 100-continue` with this final response right away.
    pub fn declining_continue(mut self) -> Self {
        self.decline_continue = true;
        self
    }

    fn builder(&self, code: u16) -> Result<ResponseBuilder> {
        let headers = if code == 100 {
            Headers::new()
        } else {
            Headers::from_pairs(self.headers.clone())?
        };
        Ok(Response::builder()
            .code(code)
            .message(self.message.clone())
            .headers(headers))
    }
}

/// What the transport does for the next exchange.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answers with a response.
    Reply(Reply),
    /// Every route attempt of `new_stream` fails to connect.
    ConnectFailure,
    /// The request is written, then reading the response fails.
    ReadFailure(TransportErrorKind),
}

/// One request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Exchange {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

#[derive(Debug, Default)]
struct State {
    steps: VecDeque<Step>,
    routes: usize,
    acquired: Vec<String>,
    exchanges: Vec<Exchange>,
    streams: usize,
    released: usize,
    stream_failures: usize,
    no_new_streams: usize,
    aborts: usize,
    open_stream: bool,
    multiplexed: bool,
    events: Vec<&'static str>,
}

/// A scripted connection provider.
#[derive(Debug, Clone)]
pub struct MockServer {
    state: Arc<Mutex<State>>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                routes: 1,
                ..State::default()
            })),
        }
    }

    /// Routes each allocation may try before giving up.
    pub fn with_routes(self, routes: usize) -> Self {
        self.lock().routes = routes;
        self
    }

    pub fn enqueue(&self, step: Step) -> &Self {
        self.lock().steps.push_back(step);
        self
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.enqueue(Step::Reply(reply))
    }

    /// Makes allocations report a stream still open after the body closed.
    pub fn leak_streams(&self) {
        self.lock().open_stream = true;
    }

    /// Makes connections report concurrent streams.
    pub fn multiplexed(&self) {
        self.lock().multiplexed = true;
    }

    /// Codec operations in call order, across every exchange.
    pub fn events(&self) -> Vec<&'static str> {
        self.lock().events.clone()
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.lock().exchanges.clone()
    }

    pub fn acquired(&self) -> Vec<String> {
        self.lock().acquired.clone()
    }

    pub fn streams(&self) -> usize {
        self.lock().streams
    }

    pub fn released(&self) -> usize {
        self.lock().released
    }

    pub fn stream_failures(&self) -> usize {
        self.lock().stream_failures
    }

    pub fn no_new_streams(&self) -> usize {
        self.lock().no_new_streams
    }

    pub fn aborts(&self) -> usize {
        self.lock().aborts
    }

    pub fn pending_steps(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn scripted(kind: TransportErrorKind) -> TransportError {
    TransportError::new(kind, io::Error::other(format!("scripted {kind} failure")))
}

impl ConnectionProvider for MockServer {
    fn acquire(&self, address: &Address) -> Result<Box<dyn StreamAllocation>> {
        let routes = {
            let mut state = self.lock();
            state.acquired.push(address.to_string());
            state.routes
        };
        Ok(Box::new(MockAllocation {
            state: Arc::clone(&self.state),
            address: address.clone(),
            routes,
            failed_routes: 0,
            route: None,
        }))
    }
}

struct MockAllocation {
    state: Arc<Mutex<State>>,
    address: Address,
    routes: usize,
    failed_routes: usize,
    route: Option<Route>,
}

impl StreamAllocation for MockAllocation {
    fn new_stream(&mut self, _request: &Request) -> Result<Box<dyn HttpCodec>> {
        let mut state = lock(&self.state);
        if matches!(state.steps.front(), Some(Step::ConnectFailure)) {
            state.steps.pop_front();
            self.route = None;
            return Err(RouteError::new(scripted(TransportErrorKind::Connect)).into());
        }
        state.streams += 1;

        let socket = SocketAddr::from((Ipv4Addr::LOCALHOST, self.address.port()));
        self.route = Some(Route::new(
            self.address.clone(),
            self.address.proxy().clone(),
            socket,
        ));
        Ok(Box::new(MockCodec {
            state: Arc::clone(&self.state),
            request: None,
            body: Vec::new(),
            reply: None,
            interim_sent: false,
        }))
    }

    fn has_open_stream(&self) -> bool {
        lock(&self.state).open_stream
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.route.as_ref().map(|route| ConnectionInfo {
            handshake: route.address().is_https().then(|| Handshake {
                tls_version: "TLSv1.3".to_string(),
                cipher_suite: "TLS_AES_128_GCM_SHA256".to_string(),
                peer_principal: Some(format!("CN={}", route.address().host())),
            }),
            multiplexed: lock(&self.state).multiplexed,
        })
    }

    fn route(&self) -> Option<Route> {
        self.route.clone()
    }

    fn has_more_routes(&self) -> bool {
        self.failed_routes < self.routes
    }

    fn stream_failed(&mut self, error: Option<&Error>) {
        lock(&self.state).stream_failures += 1;
        if error.is_some() {
            self.failed_routes += 1;
        }
    }

    fn no_new_streams(&mut self) {
        lock(&self.state).no_new_streams += 1;
    }

    fn release(&mut self) {
        lock(&self.state).released += 1;
    }

    fn abort_handle(&self) -> AbortHandle {
        let state = Arc::clone(&self.state);
        AbortHandle::new(move || lock(&state).aborts += 1)
    }
}

struct MockCodec {
    state: Arc<Mutex<State>>,
    request: Option<Request>,
    body: Vec<u8>,
    reply: Option<Reply>,
    interim_sent: bool,
}

impl MockCodec {
    fn record(&self, event: &'static str) {
        lock(&self.state).events.push(event);
    }

    /// The reply for this exchange, taken from the script on first use.
    fn next_reply(&mut self) -> Result<Reply> {
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let step = lock(&self.state).steps.pop_front();
        match step {
            Some(Step::Reply(reply)) => {
                self.reply = Some(reply.clone());
                Ok(reply)
            }
            Some(Step::ReadFailure(kind)) => Err(scripted(kind).into()),
            Some(Step::ConnectFailure) => Err(Error::protocol("connect failure scripted mid-exchange")),
            None => Err(scripted(TransportErrorKind::ConnectionShutdown).into()),
        }
    }
}

impl HttpCodec for MockCodec {
    fn write_request_headers(&mut self, request: &Request) -> Result<()> {
        self.record("headers");
        self.request = Some(request.clone());
        Ok(())
    }

    fn create_request_body(
        &mut self,
        _request: &Request,
        _content_length: i64,
    ) -> Result<Box<dyn Write + '_>> {
        self.record("body");
        Ok(Box::new(&mut self.body))
    }

    fn flush_request(&mut self) -> Result<()> {
        self.record("flush");
        Ok(())
    }

    fn finish_request(&mut self) -> Result<()> {
        self.record("finish");
        let Some(request) = &self.request else {
            return Err(Error::illegal_state("request headers were never written"));
        };
        let exchange = Exchange {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
            body: std::mem::take(&mut self.body),
        };
        lock(&self.state).exchanges.push(exchange);
        Ok(())
    }

    fn read_response_headers(&mut self, expect_continue: bool) -> Result<Option<ResponseBuilder>> {
        self.record(if expect_continue { "await_continue" } else { "read_final" });
        let reply = self.next_reply()?;
        if expect_continue {
            return if reply.decline_continue {
                reply.builder(reply.code).map(Some)
            } else {
                Ok(None)
            };
        }
        if reply.interim_continue && !self.interim_sent {
            self.interim_sent = true;
            return reply.builder(100).map(Some);
        }
        reply.builder(reply.code).map(Some)
    }

    fn open_response_body(&mut self, response: &Response) -> Result<ResponseBody> {
        let reply = self.next_reply()?;
        Ok(ResponseBody::new(
            response.header("Content-Type").map(str::to_string),
            response.headers().content_length(),
            Cursor::new(reply.body),
        ))
    }

    fn cancel(&mut self) {
        self.record("cancel");
    }
}
