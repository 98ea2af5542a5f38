//! Error types for the call pipeline.
//!
//! Two families live here. [`ClassifiedFailure`] and [`TransportError`] travel
//! through the pipeline and are always turned into an [`ApiResult`] before a
//! caller sees them. [`Error`] covers client configuration mistakes reported
//! by [`ClientBuilder`](crate::ClientBuilder).

use crate::result::{ApiResult, ApiResultCode};
use http::StatusCode;

/// A boxed error from a collaborator outside the pipeline.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure that already carries its [`ApiResult`].
///
/// This is the only failure kind allowed to settle the pipeline without being
/// re-mapped. Anything else is translated into one before the caller sees it.
///
/// # Examples
///
/// ```
/// use outcall::{ApiResult, ApiResultCode, ClassifiedFailure};
///
/// let failure = ClassifiedFailure::new(
///     ApiResult::new(ApiResultCode::InvalidParameter).with_failure_message("missing id"),
/// );
///
/// assert_eq!(failure.to_string(), "missing id");
/// assert_eq!(failure.result().result_code(), ApiResultCode::InvalidParameter);
/// assert_eq!(failure.http_status().as_u16(), 500);
/// ```
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct ClassifiedFailure {
    result: ApiResult,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ClassifiedFailure {
    /// Wraps a result. The display message is the result's failure message,
    /// or the code's message when there is none.
    pub fn new(result: ApiResult) -> Self {
        let message = result
            .failure_message()
            .unwrap_or_else(|| result.message())
            .to_string();
        Self {
            result,
            message,
            source: None,
        }
    }

    /// Wraps a result together with the error that caused it.
    pub fn with_source(result: ApiResult, source: impl Into<BoxError>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(result)
        }
    }

    pub fn result(&self) -> &ApiResult {
        &self.result
    }

    pub fn into_result(self) -> ApiResult {
        self.result
    }

    /// The status to answer with when this failure is returned from a server
    /// handler: the carried status, or `500 Internal Server Error`.
    pub fn http_status(&self) -> StatusCode {
        self.result
            .status()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A fault raised by the transport before or while reading a response.
///
/// The transport collaborator sorts its failures into these variants; the
/// error resolver maps each variant to a result code.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The server did not answer in time.
    #[error("Request timed out: {0}")]
    Timeout(#[source] BoxError),

    /// The secure handshake did not complete in time.
    #[error("TLS handshake timed out: {0}")]
    HandshakeTimeout(#[source] BoxError),

    /// The request could not be delivered (DNS failure, refused connection,
    /// connect timeout on plain http).
    #[error("Failed to connect: {0}")]
    Connect(#[source] BoxError),

    /// Any other fault.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    /// Returns the wrapped collaborator error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            TransportError::Timeout(e)
            | TransportError::HandshakeTimeout(e)
            | TransportError::Connect(e)
            | TransportError::Other(e) => e.as_ref(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() && error.is_connect() && is_tls_url(error.url()) {
            // reqwest folds the TLS handshake into connection setup.
            TransportError::HandshakeTimeout(Box::new(error))
        } else if error.is_connect() {
            TransportError::Connect(Box::new(error))
        } else if error.is_timeout() {
            TransportError::Timeout(Box::new(error))
        } else if error.is_request() {
            TransportError::Connect(Box::new(error))
        } else {
            TransportError::Other(Box::new(error))
        }
    }
}

/// Only https connections run a handshake during connection setup.
fn is_tls_url(url: Option<&url::Url>) -> bool {
    url.is_some_and(|url| url.scheme() == "https")
}

/// A failed pipeline stage.
#[derive(thiserror::Error, Debug)]
pub enum Fault {
    #[error(transparent)]
    Classified(#[from] ClassifiedFailure),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Fault {
    /// Returns the classified failure this fault is or wraps, if any.
    pub fn classified(&self) -> Option<&ClassifiedFailure> {
        match self {
            Fault::Classified(failure) => Some(failure),
            Fault::Transport(error) => find_classified(error),
        }
    }
}

/// Walks the `source()` chain of `error` looking for a [`ClassifiedFailure`].
///
/// The pipeline propagates classified failures explicitly, so this only
/// matters for errors produced by collaborators that wrap one.
///
/// # Examples
///
/// ```
/// use outcall::{find_classified, ApiResult, ApiResultCode, ClassifiedFailure, TransportError};
///
/// let failure = ClassifiedFailure::new(ApiResult::new(ApiResultCode::InvalidAuth));
/// let wrapped = TransportError::Other(Box::new(failure));
///
/// let found = find_classified(&wrapped).unwrap();
/// assert_eq!(found.result().result_code(), ApiResultCode::InvalidAuth);
/// ```
pub fn find_classified<'a>(
    error: &'a (dyn std::error::Error + 'static),
) -> Option<&'a ClassifiedFailure> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(failure) = err.downcast_ref::<ClassifiedFailure>() {
            return Some(failure);
        }
        current = err.source();
    }
    None
}

/// Builds a `FAILED_TO_DESERIALIZE` result.
pub(crate) fn deserialize_failure(
    status: Option<StatusCode>,
    headers: Option<http::HeaderMap>,
    detail: impl Into<String>,
) -> ApiResult {
    let status_text = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<none>".to_string());
    let result = ApiResult::new(ApiResultCode::FailedToDeserialize)
        .with_response_headers(headers)
        .with_failure_message(format!(
            "Given status {}. But, failed to build the response from its body.",
            status_text
        ))
        .with_failure_detail(detail);
    match status {
        Some(status) => result.with_status(status),
        None => result,
    }
}

/// Configuration errors reported while building a [`Client`](crate::Client).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration was provided, such as a bad header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be created.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// A specialized `Result` type for client configuration.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    #[error("outer")]
    struct Outer(#[source] ClassifiedFailure);

    #[test]
    fn test_only_https_connects_can_time_out_in_handshake() {
        let https = url::Url::parse("https://api.example.com/x").unwrap();
        let http = url::Url::parse("http://api.example.com/x").unwrap();

        assert!(is_tls_url(Some(&https)));
        assert!(!is_tls_url(Some(&http)));
        assert!(!is_tls_url(None));
    }

    #[test]
    fn test_failure_message_defaults_to_code_message() {
        let failure = ClassifiedFailure::new(ApiResult::new(ApiResultCode::InvalidNetwork));
        assert_eq!(failure.to_string(), "Network Error");
    }

    #[test]
    fn test_find_classified_through_nested_sources() {
        let failure = ClassifiedFailure::new(ApiResult::new(ApiResultCode::InvalidAuth));
        let error = TransportError::Other(Box::new(Outer(failure)));

        let found = find_classified(&error).unwrap();
        assert_eq!(found.result().result_code(), ApiResultCode::InvalidAuth);
    }

    #[test]
    fn test_find_classified_none_for_plain_errors() {
        let error = TransportError::Connect("connection refused".into());
        assert!(find_classified(&error).is_none());
        assert!(Fault::from(error).classified().is_none());
    }

    #[test]
    fn test_fault_classified_direct() {
        let fault = Fault::from(ClassifiedFailure::new(ApiResult::new(
            ApiResultCode::InvalidResponse,
        )));
        assert_eq!(
            fault.classified().unwrap().result().result_code(),
            ApiResultCode::InvalidResponse
        );
    }

    #[test]
    fn test_http_status_prefers_carried_status() {
        let failure = ClassifiedFailure::new(ApiResult::from_status(
            Some(StatusCode::NOT_FOUND),
            None,
        ));
        assert_eq!(failure.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_deserialize_failure_shape() {
        let result = deserialize_failure(Some(StatusCode::OK), None, "expected value");
        assert_eq!(result.result_code(), ApiResultCode::FailedToDeserialize);
        assert_eq!(result.status(), Some(StatusCode::OK));
        assert_eq!(result.failure_detail(), Some("expected value"));
        assert!(result.failure_message().unwrap().contains("200 OK"));
    }
}
