//! Maps transport faults that escaped the retry loop onto result codes.

use crate::error::{find_classified, TransportError};
use crate::response::{failed_response, ApiResponse};
use crate::result::{ApiResult, ApiResultCode};

/// Turns a transport fault into `R::default()` carrying the matching result.
///
/// | fault                                | code                 |
/// |--------------------------------------|----------------------|
/// | [`TransportError::Timeout`]          | `CONNECTION_TIMEOUT` |
/// | [`TransportError::HandshakeTimeout`] | `CONNECTION_FAIL`    |
/// | [`TransportError::Connect`]          | `INVALID_NETWORK`    |
/// | wraps a `ClassifiedFailure`          | carried result       |
/// | anything else                        | `INVALID_SYSTEM`     |
pub fn resolve<R: ApiResponse>(error: TransportError) -> R {
    let result = resolve_result(&error);
    tracing::warn!(
        code = result.code(),
        error = %error,
        "Request failed before a response was classified"
    );
    failed_response(result)
}

fn resolve_result(error: &TransportError) -> ApiResult {
    match error {
        TransportError::Timeout(_) => ApiResult::new(ApiResultCode::ConnectionTimeout)
            .with_failure_message("Request Timeout")
            .with_failure_detail(error.to_string()),
        TransportError::HandshakeTimeout(_) => ApiResult::new(ApiResultCode::ConnectionFail)
            .with_failure_message("SSL Handshake Timeout")
            .with_failure_detail(error.to_string()),
        TransportError::Connect(_) => ApiResult::new(ApiResultCode::InvalidNetwork)
            .with_failure_message("Failed to connect to the server")
            .with_failure_detail(error.to_string()),
        TransportError::Other(inner) => {
            if let Some(failure) = find_classified(error) {
                return failure.result().clone();
            }

            let result =
                ApiResult::new(ApiResultCode::InvalidSystem).with_failure_message(inner.to_string());
            match root_cause(inner.as_ref()) {
                Some(cause) => result.with_failure_detail(format!("Cause: {}", cause)),
                None => result,
            }
        }
    }
}

/// The deepest error below `error`, if it has any source at all.
fn root_cause<'a>(
    error: &'a (dyn std::error::Error + 'static),
) -> Option<&'a (dyn std::error::Error + 'static)> {
    let mut cause = error.source()?;
    while let Some(next) = cause.source() {
        cause = next;
    }
    Some(cause)
}
