//! Caller-supplied lifecycle hooks and the dispatcher that fires them.
//!
//! For every call the dispatcher reports exactly one terminal outcome and then
//! exactly one [`after_finished`](HttpCallbackHandler::after_finished):
//!
//! - a response (successful or carrying a failure result) goes to
//!   [`on_response`](HttpCallbackHandler::on_response), then
//!   `after_finished(Signal::Complete)`;
//! - a failure while wiring up the call goes to
//!   [`on_error`](HttpCallbackHandler::on_error), then
//!   `after_finished(Signal::Error)`;
//! - a call dropped before it settles only gets
//!   `after_finished(Signal::Cancel)`.

use crate::error::ClassifiedFailure;
use crate::response::ApiResponse;
use http::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A response was delivered.
    Complete,
    /// The call failed before a response could be produced.
    Error,
    /// The call was dropped before it settled.
    Cancel,
}

/// What the hooks can see about the call they observe.
#[derive(Debug)]
pub struct CallContext {
    method: Method,
    url: String,
    started: Instant,
    attempts: AtomicUsize,
}

impl CallContext {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            started: Instant::now(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URL. When the request could not be built, the base URL
    /// joined with the unexpanded path template.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Attempts issued so far, the first one included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Counts a new attempt and returns its 1-based number.
    pub(crate) fn record_attempt(&self) -> usize {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Observes the lifecycle of a call.
///
/// Every method has an empty default, so implementors override only what they
/// need. Hooks receive shared references: they observe the outcome and can't
/// change what the caller receives.
///
/// # Examples
///
/// ```
/// use outcall::{CallContext, Envelope, HttpCallbackHandler, Signal};
///
/// struct Audit;
///
/// impl HttpCallbackHandler<Envelope<serde_json::Value>> for Audit {
///     fn on_failed(&self, response: &Envelope<serde_json::Value>, context: &CallContext) {
///         eprintln!("{} {} failed: {:?}", context.method(), context.url(), response);
///     }
///
///     fn after_finished(&self, signal: Signal, context: &CallContext) {
///         eprintln!("{:?} after {} attempt(s)", signal, context.attempts());
///     }
/// }
/// ```
pub trait HttpCallbackHandler<R: ApiResponse>: Send + Sync {
    /// Routes a response to [`on_success`](Self::on_success) or
    /// [`on_failed`](Self::on_failed) based on [`ApiResponse::is_success`].
    fn on_response(&self, response: &R, context: &CallContext) {
        if response.is_success() {
            self.on_success(response, context);
        } else {
            self.on_failed(response, context);
        }
    }

    fn on_success(&self, _response: &R, _context: &CallContext) {}

    /// Called for responses carrying a failure result, including transport
    /// faults that were mapped to one.
    fn on_failed(&self, _response: &R, _context: &CallContext) {}

    /// Called when the call could not be wired up.
    fn on_error(&self, _failure: &ClassifiedFailure, _context: &CallContext) {}

    /// Called exactly once per call, after every other hook.
    fn after_finished(&self, _signal: Signal, _context: &CallContext) {}
}

/// Fires the hooks of one call.
///
/// Dropping an unsettled dispatcher reports [`Signal::Cancel`], so a call
/// future dropped mid-flight still finishes its lifecycle.
pub(crate) struct Dispatcher<'a, R: ApiResponse> {
    handler: Option<&'a dyn HttpCallbackHandler<R>>,
    context: CallContext,
    settled: bool,
}

impl<'a, R: ApiResponse> Dispatcher<'a, R> {
    pub(crate) fn new(handler: Option<&'a dyn HttpCallbackHandler<R>>, context: CallContext) -> Self {
        Self {
            handler,
            context,
            settled: false,
        }
    }

    pub(crate) fn context(&self) -> &CallContext {
        &self.context
    }

    /// Reports a delivered response.
    pub(crate) fn complete(mut self, response: &R) {
        self.settled = true;
        if let Some(handler) = self.handler {
            tracing::debug!(
                url = %self.context.url,
                success = response.is_success(),
                "Dispatching response to handler"
            );
            handler.on_response(response, &self.context);
            handler.after_finished(Signal::Complete, &self.context);
        }
    }

    /// Reports a failure that prevented the call from running.
    pub(crate) fn fail(mut self, failure: &ClassifiedFailure) {
        self.settled = true;
        if let Some(handler) = self.handler {
            tracing::debug!(
                url = %self.context.url,
                code = failure.result().result_code().name(),
                "Dispatching error to handler"
            );
            handler.on_error(failure, &self.context);
            handler.after_finished(Signal::Error, &self.context);
        }
    }
}

impl<R: ApiResponse> Drop for Dispatcher<'_, R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(handler) = self.handler {
            tracing::debug!(url = %self.context.url, "Call cancelled before it settled");
            handler.after_finished(Signal::Cancel, &self.context);
        }
    }
}
