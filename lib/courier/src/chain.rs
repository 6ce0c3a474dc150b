//! The interceptor chain.
//!
//! A call runs a fixed, ordered list of [`Interceptor`]s. Each one receives a
//! [`Chain`] positioned just after it and calls [`Chain::proceed`] to hand a
//! request to the rest of the list.
//!
//! Once a codec is installed (past the connect stage) every network
//! interceptor must call `proceed` exactly once and keep the request's host
//! and port.

use std::fmt;
use std::sync::Arc;

use courier_core::{Error, HttpCodec, Request, Response, Result, StreamAllocation, Url};

use crate::call::CallContext;

/// One stage of the call pipeline.
///
/// # Example
///
/// ```ignore
/// use courier::{Chain, Interceptor, Response, Result};
///
/// struct Tracing;
///
/// impl Interceptor for Tracing {
///     fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
///         let request = chain.request().new_builder().header("X-Trace", "1").build()?;
///         chain.proceed(request)
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    /// Handles `chain.request()`, usually by calling [`Chain::proceed`].
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response>;

    /// Name used in chain-discipline errors and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An [`Interceptor`] backed by a closure. Created with [`interceptor_fn`].
#[derive(Clone)]
pub struct FnInterceptor<F> {
    f: F,
}

/// Wraps a closure into an [`Interceptor`].
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut Chain<'_>) -> Result<Response> + Send + Sync,
{
    FnInterceptor { f }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Chain<'_>) -> Result<Response> + Send + Sync,
{
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        (self.f)(chain)
    }

    fn name(&self) -> &'static str {
        "interceptor_fn"
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").finish_non_exhaustive()
    }
}

/// Host and port a codec was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Authority {
    host: Option<String>,
    port: Option<u16>,
}

impl Authority {
    fn of(url: &Url) -> Self {
        Self {
            host: url.host_str().map(str::to_string),
            port: url.port_or_known_default(),
        }
    }

    fn matches(&self, url: &Url) -> bool {
        *self == Self::of(url)
    }
}

/// What the next node inherits from the current one.
struct Links<'b> {
    allocation: Option<&'b mut (dyn StreamAllocation + 'static)>,
    codec: Option<&'b mut (dyn HttpCodec + 'static)>,
    authority: Option<Authority>,
}

/// A position in the interceptor list, handed to the interceptor before it.
pub struct Chain<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    index: usize,
    request: Request,
    call: &'a CallContext,
    allocation: Option<&'a mut (dyn StreamAllocation + 'static)>,
    codec: Option<&'a mut (dyn HttpCodec + 'static)>,
    authority: Option<Authority>,
    calls: usize,
}

impl<'a> Chain<'a> {
    /// The chain a call starts from.
    pub(crate) fn root(
        interceptors: &'a [Arc<dyn Interceptor>],
        request: Request,
        call: &'a CallContext,
    ) -> Self {
        Self {
            interceptors,
            index: 0,
            request,
            call,
            allocation: None,
            codec: None,
            authority: None,
            calls: 0,
        }
    }

    /// The request this node was given.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The call being executed.
    #[must_use]
    pub const fn call(&self) -> &'a CallContext {
        self.call
    }

    /// The connection allocation, once the follow-up stage acquired one.
    pub fn allocation(&mut self) -> Option<&mut (dyn StreamAllocation + 'static)> {
        self.allocation.as_deref_mut()
    }

    /// The codec, once the connect stage opened one.
    pub fn codec(&mut self) -> Option<&mut (dyn HttpCodec + 'static)> {
        self.codec.as_deref_mut()
    }

    /// Both the allocation and its codec, for the stage doing the exchange.
    pub fn connection_parts(
        &mut self,
    ) -> Result<(&mut (dyn StreamAllocation + 'static), &mut (dyn HttpCodec + 'static))> {
        match (self.allocation.as_deref_mut(), self.codec.as_deref_mut()) {
            (Some(allocation), Some(codec)) => Ok((allocation, codec)),
            _ => Err(Error::illegal_state(
                "no connection: the exchange must run after the connect stage",
            )),
        }
    }

    /// Hands `request` to the next interceptor.
    pub fn proceed(&mut self, request: Request) -> Result<Response> {
        let links = Links {
            allocation: self.allocation.as_deref_mut(),
            codec: self.codec.as_deref_mut(),
            authority: self.authority.clone(),
        };
        advance(self.interceptors, self.index, self.call, &mut self.calls, request, links)
    }

    /// Hands `request` to the next interceptor over `allocation`.
    pub fn proceed_with_allocation(
        &mut self,
        request: Request,
        allocation: &mut (dyn StreamAllocation + 'static),
    ) -> Result<Response> {
        let links = Links {
            allocation: Some(allocation),
            codec: None,
            authority: None,
        };
        advance(self.interceptors, self.index, self.call, &mut self.calls, request, links)
    }

    /// Hands `request` to the next interceptor over `codec`, opened on the
    /// current allocation for the request's host and port.
    pub fn proceed_with_codec(
        &mut self,
        request: Request,
        codec: &mut (dyn HttpCodec + 'static),
    ) -> Result<Response> {
        let links = Links {
            authority: Some(Authority::of(request.url())),
            allocation: self.allocation.as_deref_mut(),
            codec: Some(codec),
        };
        advance(self.interceptors, self.index, self.call, &mut self.calls, request, links)
    }
}

fn advance(
    interceptors: &[Arc<dyn Interceptor>],
    index: usize,
    call: &CallContext,
    calls: &mut usize,
    request: Request,
    links: Links<'_>,
) -> Result<Response> {
    let interceptor = interceptors
        .get(index)
        .ok_or_else(|| Error::illegal_state("the last interceptor must not call proceed()"))?;

    *calls += 1;

    let network = links.codec.is_some();
    if network {
        let previous = index
            .checked_sub(1)
            .and_then(|i| interceptors.get(i))
            .map_or("connect stage", |previous| previous.name());

        if links
            .authority
            .as_ref()
            .is_some_and(|authority| !authority.matches(request.url()))
        {
            return Err(Error::illegal_state(format!(
                "network interceptor {previous} must retain the same host and port"
            )));
        }
        if *calls > 1 {
            return Err(Error::illegal_state(format!(
                "network interceptor {previous} must call proceed() exactly once"
            )));
        }
    }

    let mut next = Chain {
        interceptors,
        index: index + 1,
        request,
        call,
        allocation: links.allocation,
        codec: links.codec,
        authority: links.authority,
        calls: 0,
    };
    let response = interceptor.intercept(&mut next)?;

    if network && index + 1 < interceptors.len() && next.calls != 1 {
        return Err(Error::illegal_state(format!(
            "network interceptor {} must call proceed() exactly once",
            interceptor.name()
        )));
    }
    if response.body().is_none() {
        return Err(Error::illegal_state(format!(
            "interceptor {} returned a response with no body",
            interceptor.name()
        )));
    }

    Ok(response)
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("index", &self.index)
            .field("request", &self.request)
            .field("has_allocation", &self.allocation.is_some())
            .field("has_codec", &self.codec.is_some())
            .finish_non_exhaustive()
    }
}
