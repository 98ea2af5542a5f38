//! The response processing pipeline: classify, retry, resolve, dispatch.

use crate::callback::{CallContext, Dispatcher, HttpCallbackHandler};
use crate::resolve::resolve;
use crate::response::ApiResponse;
use crate::retry::{send_with_retry, RetryPolicy};
use crate::transport::{ApiRequest, Transport};
use std::future::Future;

/// Runs one call through the whole pipeline.
///
/// The returned future always yields an `R`: decoded on success, or
/// `R::default()` carrying the failure result otherwise. The optional
/// `handler` observes the outcome and then `after_finished` exactly once.
///
/// Dropping the future before it completes aborts any in-flight exchange or
/// pending backoff and reports `after_finished(Signal::Cancel)`. No further
/// attempt is started.
///
/// # Examples
///
/// ```no_run
/// use outcall::transport::{ApiRequest, ReqwestTransport, TransportConfig};
/// use outcall::{execute, ApiResponse, Envelope, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new(&TransportConfig::default())?;
/// let request = ApiRequest::new(http::Method::GET, "https://api.example.com/ping".parse()?);
/// let policy = RetryPolicy::new(Some(2), Some(Duration::from_millis(500)));
///
/// let pong: Envelope<serde_json::Value> = execute(&transport, &request, &policy, None).await;
/// if !pong.is_success() {
///     println!("{:?}", pong.api_result());
/// }
/// # Ok(())
/// # }
/// ```
pub fn execute<'a, T, R>(
    transport: &'a T,
    request: &'a ApiRequest,
    policy: &'a RetryPolicy,
    handler: Option<&'a dyn HttpCallbackHandler<R>>,
) -> impl Future<Output = R> + Send + 'a
where
    T: Transport,
    R: ApiResponse,
{
    // Created before the first poll so that dropping an unpolled call still
    // reports cancellation.
    let dispatcher = Dispatcher::new(
        handler,
        CallContext::new(request.method.clone(), request.url.as_str()),
    );

    async move {
        let outcome = send_with_retry::<T, R>(transport, request, policy, dispatcher.context()).await;
        let response = outcome.unwrap_or_else(resolve);
        dispatcher.complete(&response);
        response
    }
}
