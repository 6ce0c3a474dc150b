//! Single-use calls and their cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use courier_core::{AbortHandle, Error, Request, Response, Result};
use tracing::{Level, debug, span, warn};

use crate::chain::{Chain, Interceptor};

/// Per-call state shared by every stage of one call.
///
/// The cancel flag may be set from any thread. The pipeline observes it at
/// loop boundaries; an in-flight read or write is interrupted through the
/// abort hook of the allocation currently held.
#[derive(Debug, Default)]
pub struct CallContext {
    canceled: AtomicBool,
    upgrade: bool,
    abort: Mutex<Option<AbortHandle>>,
}

impl CallContext {
    /// Creates a context. `upgrade` marks a protocol upgrade call, whose
    /// `101 Switching Protocols` response gets an empty body.
    #[must_use]
    pub fn new(upgrade: bool) -> Self {
        Self {
            canceled: AtomicBool::new(false),
            upgrade,
            abort: Mutex::new(None),
        }
    }

    /// Returns `true` once [`CallContext::cancel`] was called.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Returns `true` for protocol upgrade calls.
    #[must_use]
    pub const fn is_upgrade(&self) -> bool {
        self.upgrade
    }

    /// Sets the cancel flag and aborts in-flight I/O, if any.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        let handle = self.lock_abort().clone();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Registers the abort hook of a freshly acquired allocation.
    ///
    /// Aborts right away if the call was already canceled.
    pub fn register_abort(&self, handle: AbortHandle) {
        *self.lock_abort() = Some(handle.clone());
        if self.is_canceled() {
            handle.abort();
        }
    }

    /// Forgets the abort hook once its allocation is released.
    pub fn clear_abort(&self) {
        self.lock_abort().take();
    }

    fn lock_abort(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.abort.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancels a call from another thread.
#[derive(Debug, Clone)]
pub struct Canceller {
    context: Arc<CallContext>,
}

impl Canceller {
    /// Cancels the call.
    pub fn cancel(&self) {
        self.context.cancel();
    }

    /// Returns `true` once the call was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.context.is_canceled()
    }
}

/// One logical exchange: a request and every follow-up it leads to.
///
/// A call executes at most once. Create calls with
/// [`Client::new_call`](crate::Client::new_call).
pub struct Call {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    request: Request,
    context: Arc<CallContext>,
    executed: AtomicBool,
}

impl Call {
    pub(crate) fn new(
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        request: Request,
        upgrade: bool,
    ) -> Self {
        Self {
            interceptors,
            request,
            context: Arc::new(CallContext::new(upgrade)),
            executed: AtomicBool::new(false),
        }
    }

    /// The original request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Runs the call to completion on the current thread.
    ///
    /// Fails with [`Error::IllegalState`] if the call was already executed.
    pub fn execute(&self) -> Result<Response> {
        if self.executed.swap(true, Ordering::SeqCst) {
            return Err(Error::illegal_state("Already Executed"));
        }

        let method = self.request.method();
        let url = self.request.url();
        let span = span!(Level::DEBUG, "call", %method, %url);
        let _entered = span.enter();

        let start = Instant::now();
        let mut chain = Chain::root(&self.interceptors, self.request.clone(), &self.context);
        let result = chain.proceed(self.request.clone());
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => debug!(status = response.code(), elapsed_ms, "call completed"),
            Err(error) => warn!(%error, elapsed_ms, "call failed"),
        }
        result
    }

    /// Cancels the call. Safe to call from any thread, at any time.
    pub fn cancel(&self) {
        debug!("call canceled");
        self.context.cancel();
    }

    /// Returns `true` once the call was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.context.is_canceled()
    }

    /// Returns `true` once [`Call::execute`] was invoked.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    /// A handle to cancel this call from another thread.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller {
            context: Arc::clone(&self.context),
        }
    }
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("request", &self.request)
            .field("stages", &self.interceptors.len())
            .field("canceled", &self.is_canceled())
            .field("executed", &self.is_executed())
            .finish()
    }
}
