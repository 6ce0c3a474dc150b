//! Opens a stream on the current allocation.

use courier_core::{Error, Response, Result};
use tracing::debug;

use crate::chain::{Chain, Interceptor};

/// Stage that opens a codec for the request and hands it to the network
/// stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectInterceptor;

impl Interceptor for ConnectInterceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Response> {
        let request = chain.request().clone();
        let allocation = chain.allocation().ok_or_else(|| {
            Error::illegal_state("connect stage must run after the follow-up stage")
        })?;

        let mut codec = allocation.new_stream(&request)?;
        debug!(url = %request.url(), "stream opened");

        chain.proceed_with_codec(request, codec.as_mut())
    }
}
