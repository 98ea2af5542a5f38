//! Turns a raw [`Exchange`] into a typed response or a classified failure.
//!
//! Error statuses never reach the decoder: a 4xx/5xx answer becomes a
//! [`ClassifiedFailure`] carrying the body text as detail. Successful answers
//! are decoded into the target type, and decode failures are classified as
//! `FAILED_TO_DESERIALIZE` on the spot. The only unclassified fault this step
//! can return is a transport error while reading a successful body.

use crate::error::{deserialize_failure, ClassifiedFailure, Fault};
use crate::response::{ApiResponse, BodyFormat};
use crate::result::ApiResult;
use crate::transport::Exchange;
use http::StatusCode;

/// Classifies one exchange and decodes its body into `R`.
///
/// # Errors
///
/// - [`Fault::Classified`] for 4xx/5xx statuses and for bodies that cannot be
///   turned into `R`.
/// - [`Fault::Transport`] when reading a successful body fails.
pub async fn classify<R: ApiResponse>(exchange: Exchange) -> Result<R, Fault> {
    let Exchange {
        status,
        headers,
        body,
    } = exchange;

    if let Some(status) = status.filter(|s| s.is_client_error() || s.is_server_error()) {
        // The status already decides the outcome, so a body that cannot be
        // read is treated as empty.
        let text = body.read_text().await.ok().flatten().unwrap_or_default();

        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                response = %text,
                "Client error (4xx)"
            );
        } else {
            tracing::warn!(
                status = status.as_u16(),
                response = %text,
                "Server error (5xx)"
            );
        }

        let mut result = ApiResult::from_status(Some(status), Some(headers))
            .with_failure_message(status_failure_message(status));
        if !text.trim().is_empty() {
            result = result.with_failure_detail(text);
        }
        return Err(ClassifiedFailure::new(result).into());
    }

    let text = body.read_text().await?;

    let mut response = match R::BODY_FORMAT {
        BodyFormat::Text => R::from_text(text.unwrap_or_default()).map_err(|e| {
            tracing::error!(error = %e, "Failed to build text response");
            let result = deserialize_failure(status, Some(headers.clone()), e.to_string());
            ClassifiedFailure::with_source(result, e)
        })?,
        BodyFormat::Json => match text.filter(|t| !t.trim().is_empty()) {
            None => R::default(),
            Some(text) => R::decode(&text).map_err(|e| {
                tracing::error!(
                    error = %e,
                    raw_response = %text,
                    "Failed to deserialize response"
                );
                let result = deserialize_failure(status, Some(headers.clone()), e.to_string());
                ClassifiedFailure::with_source(result, e)
            })?,
        },
    };

    if response.api_result().is_none() {
        response.set_api_result(ApiResult::from_status(status, Some(headers)));
    }
    Ok(response)
}

fn status_failure_message(status: StatusCode) -> String {
    format!(
        "Failed to call API. Status Code: [{}] {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::response::{Envelope, StringBody};
    use crate::result::ApiResultCode;
    use crate::transport::Body;
    use http::{HeaderMap, HeaderValue};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Account {
        id: u64,
        owner: String,
    }

    static STRICT_DECODES: AtomicUsize = AtomicUsize::new(0);

    /// Counts every decode attempt.
    #[derive(Debug, Default, Deserialize)]
    #[serde(transparent)]
    struct Strict {
        inner: Envelope<Account>,
    }

    impl ApiResponse for Strict {
        fn api_result(&self) -> Option<&ApiResult> {
            self.inner.api_result()
        }

        fn set_api_result(&mut self, result: ApiResult) {
            self.inner.set_api_result(result);
        }

        fn decode(body: &str) -> Result<Self, serde_json::Error> {
            STRICT_DECODES.fetch_add(1, Ordering::SeqCst);
            serde_json::from_str(body)
        }
    }

    /// A text response type whose construction always fails.
    #[derive(Debug, Default, Deserialize)]
    struct Unbuildable;

    impl ApiResponse for Unbuildable {
        const BODY_FORMAT: BodyFormat = BodyFormat::Text;

        fn api_result(&self) -> Option<&ApiResult> {
            None
        }

        fn set_api_result(&mut self, _result: ApiResult) {}

        fn from_text(_body: String) -> Result<Self, crate::error::BoxError> {
            Err("no text constructor".into())
        }
    }

    fn exchange(status: u16, body: Body) -> Exchange {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        Exchange::new(StatusCode::from_u16(status).unwrap(), headers, body)
    }

    fn expect_classified<R: std::fmt::Debug>(outcome: Result<R, Fault>) -> ApiResult {
        match outcome {
            Err(Fault::Classified(failure)) => failure.into_result(),
            other => panic!("Expected classified failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_never_decodes_body() {
        let before = STRICT_DECODES.load(Ordering::SeqCst);
        let outcome = classify::<Strict>(exchange(500, Body::text("boom"))).await;
        let result = expect_classified(outcome);

        assert_eq!(STRICT_DECODES.load(Ordering::SeqCst), before);
        assert_eq!(result.result_code(), ApiResultCode::InvalidResponse);
        assert_eq!(result.failure_detail(), Some("boom"));
        assert_eq!(
            result.failure_message(),
            Some("Failed to call API. Status Code: [500] Internal Server Error")
        );
        assert_eq!(result.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(
            result.response_headers().unwrap().get("x-request-id").unwrap(),
            "abc"
        );
    }

    #[tokio::test]
    async fn test_client_errors_map_by_status() {
        let result = expect_classified(
            classify::<Envelope<Account>>(exchange(400, Body::text("  "))).await,
        );
        assert_eq!(result.result_code(), ApiResultCode::InvalidParameter);
        assert_eq!(result.failure_detail(), None);

        let result =
            expect_classified(classify::<Envelope<Account>>(exchange(401, Body::empty())).await);
        assert_eq!(result.result_code(), ApiResultCode::InvalidAuth);
    }

    #[tokio::test]
    async fn test_error_status_with_unreadable_body() {
        let body = Body::deferred(async { Err(TransportError::Other("reset".into())) });
        let result = expect_classified(classify::<Envelope<Account>>(exchange(503, body)).await);
        assert_eq!(result.result_code(), ApiResultCode::InvalidResponse);
        assert_eq!(result.failure_detail(), None);
    }

    #[tokio::test]
    async fn test_empty_success_body_is_default() {
        let response = classify::<Envelope<Account>>(exchange(200, Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.data, Account::default());
        assert_eq!(
            response.api_result().unwrap().result_code(),
            ApiResultCode::Success
        );

        let response = classify::<Envelope<Account>>(exchange(204, Body::text("")))
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_json_body_decoded_with_headers() {
        let response = classify::<Envelope<Account>>(exchange(
            201,
            Body::text(r#"{"id": 5, "owner": "lee"}"#),
        ))
        .await
        .unwrap();

        assert_eq!(response.id, 5);
        let result = response.api_result().unwrap();
        assert_eq!(result.status(), Some(StatusCode::CREATED));
        assert!(result.response_headers().unwrap().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_decode_failure_is_classified() {
        let result = expect_classified(
            classify::<Envelope<Account>>(exchange(200, Body::text("invalid json"))).await,
        );
        assert_eq!(result.result_code(), ApiResultCode::FailedToDeserialize);
        assert_eq!(result.status(), Some(StatusCode::OK));
        assert!(result.failure_detail().unwrap().contains("expected"));
    }

    #[tokio::test]
    async fn test_string_body_keeps_text() {
        let response = classify::<StringBody>(exchange(200, Body::text("plain text")))
            .await
            .unwrap();
        assert_eq!(response.body(), "plain text");
        assert!(response.is_success());

        let response = classify::<StringBody>(exchange(200, Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.body(), "");
    }

    #[tokio::test]
    async fn test_text_construction_failure_is_classified() {
        let result =
            expect_classified(classify::<Unbuildable>(exchange(200, Body::text("x"))).await);
        assert_eq!(result.result_code(), ApiResultCode::FailedToDeserialize);
        assert_eq!(result.failure_detail(), Some("no text constructor"));
    }

    #[tokio::test]
    async fn test_success_body_read_failure_is_transport_fault() {
        let body = Body::deferred(async { Err(TransportError::Timeout("stalled".into())) });
        let outcome = classify::<Envelope<Account>>(exchange(200, body)).await;
        assert!(matches!(
            outcome,
            Err(Fault::Transport(TransportError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_status_is_unknown() {
        let exchange = Exchange {
            status: None,
            headers: HeaderMap::new(),
            body: Body::empty(),
        };
        let response = classify::<Envelope<Account>>(exchange).await.unwrap();
        assert_eq!(
            response.api_result().unwrap().result_code(),
            ApiResultCode::UnknownStatus
        );
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_decoding_is_repeatable() {
        let body = r#"{"id": 11, "owner": "park"}"#;
        let first = classify::<Envelope<Account>>(exchange(200, Body::text(body)))
            .await
            .unwrap();
        let second = classify::<Envelope<Account>>(exchange(200, Body::text(body)))
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
