//! The outcome envelope attached to every response.
//!
//! An [`ApiResult`] describes how one exchange attempt ended: the HTTP status
//! (when one was received), the response headers, a closed [`ApiResultCode`],
//! and optional human-readable failure text. The pipeline creates one per
//! attempt and keeps the last one.

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed taxonomy of call outcomes.
///
/// Each member carries a stable four-digit code and a message in two locales.
///
/// # Examples
///
/// ```
/// use outcall::ApiResultCode;
/// use http::StatusCode;
///
/// assert_eq!(ApiResultCode::from_status(Some(StatusCode::OK)), ApiResultCode::Success);
/// assert_eq!(ApiResultCode::from_status(Some(StatusCode::FORBIDDEN)), ApiResultCode::InvalidAuth);
/// assert_eq!(ApiResultCode::from_status(None), ApiResultCode::UnknownStatus);
/// assert_eq!(ApiResultCode::ExhaustedRetries.code(), "1102");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiResultCode {
    /// The exchange succeeded.
    Success,
    /// The server rejected the request parameters (400).
    InvalidParameter,
    /// The server answered with an error status other than 400/401/403.
    InvalidResponse,
    /// The server rejected the credentials (401, 403).
    InvalidAuth,
    /// An unexpected fault inside the client.
    InvalidSystem,
    /// The request body could not be encoded.
    FailedToSerialize,
    /// The response body could not be decoded into the target type.
    FailedToDeserialize,
    /// Anything not covered by another code.
    InvalidEtc,
    /// The server could not be reached.
    InvalidNetwork,
    /// Every retry failed with an unclassified fault.
    #[serde(rename = "EXHAUSTED_RETIRES")]
    ExhaustedRetries,
    /// The connection could not be established (TLS handshake timeout).
    ConnectionFail,
    /// The server did not answer in time.
    ConnectionTimeout,
    /// The status was missing or outside every known class.
    UnknownStatus,
}

impl ApiResultCode {
    /// Maps an HTTP status to a result code.
    ///
    /// 1xx/2xx/3xx map to `Success`, 401 and 403 to `InvalidAuth`, 400 to
    /// `InvalidParameter`, any other 4xx/5xx to `InvalidResponse`, and
    /// everything else (including a missing status) to `UnknownStatus`.
    pub fn from_status(status: Option<StatusCode>) -> Self {
        let Some(status) = status else {
            return ApiResultCode::UnknownStatus;
        };

        if status.is_informational() || status.is_success() || status.is_redirection() {
            ApiResultCode::Success
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ApiResultCode::InvalidAuth
        } else if status == StatusCode::BAD_REQUEST {
            ApiResultCode::InvalidParameter
        } else if status.is_client_error() || status.is_server_error() {
            ApiResultCode::InvalidResponse
        } else {
            ApiResultCode::UnknownStatus
        }
    }

    /// The wire name, as used when the code is serialized.
    pub fn name(&self) -> &'static str {
        match self {
            ApiResultCode::Success => "SUCCESS",
            ApiResultCode::InvalidParameter => "INVALID_PARAMETER",
            ApiResultCode::InvalidResponse => "INVALID_RESPONSE",
            ApiResultCode::InvalidAuth => "INVALID_AUTH",
            ApiResultCode::InvalidSystem => "INVALID_SYSTEM",
            ApiResultCode::FailedToSerialize => "FAILED_TO_SERIALIZE",
            ApiResultCode::FailedToDeserialize => "FAILED_TO_DESERIALIZE",
            ApiResultCode::InvalidEtc => "INVALID_ETC",
            ApiResultCode::InvalidNetwork => "INVALID_NETWORK",
            ApiResultCode::ExhaustedRetries => "EXHAUSTED_RETIRES",
            ApiResultCode::ConnectionFail => "CONNECTION_FAIL",
            ApiResultCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ApiResultCode::UnknownStatus => "UNKNOWN_STATUS",
        }
    }

    /// The stable four-digit code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiResultCode::Success => "0000",
            ApiResultCode::InvalidParameter => "1000",
            ApiResultCode::InvalidResponse => "1002",
            ApiResultCode::InvalidAuth => "1003",
            ApiResultCode::InvalidSystem => "1004",
            ApiResultCode::FailedToSerialize => "1011",
            ApiResultCode::FailedToDeserialize => "1012",
            ApiResultCode::InvalidEtc => "1099",
            ApiResultCode::InvalidNetwork => "1101",
            ApiResultCode::ExhaustedRetries => "1102",
            ApiResultCode::ConnectionFail => "1103",
            ApiResultCode::ConnectionTimeout => "1104",
            ApiResultCode::UnknownStatus => "9999",
        }
    }

    /// The English message.
    pub fn message(&self) -> &'static str {
        match self {
            ApiResultCode::Success => "Success",
            ApiResultCode::InvalidParameter => "Invalid parameter",
            ApiResultCode::InvalidResponse => "Invalid response",
            ApiResultCode::InvalidAuth => "Invalid authentication",
            ApiResultCode::InvalidSystem => "System Error",
            ApiResultCode::FailedToSerialize => "Failed to serialization",
            ApiResultCode::FailedToDeserialize => "Failed to deserialization",
            ApiResultCode::InvalidEtc => "Unknown Error",
            ApiResultCode::InvalidNetwork => "Network Error",
            ApiResultCode::ExhaustedRetries => "Exhausted retries",
            ApiResultCode::ConnectionFail => "Failed to connect TCP socket",
            ApiResultCode::ConnectionTimeout => "Connection timeout",
            ApiResultCode::UnknownStatus => "Invalid API Status",
        }
    }

    /// The Korean message.
    pub fn message_ko(&self) -> &'static str {
        match self {
            ApiResultCode::Success => "성공",
            ApiResultCode::InvalidParameter => "파라미터 오류",
            ApiResultCode::InvalidResponse => "응답 오류",
            ApiResultCode::InvalidAuth => "인증 오류",
            ApiResultCode::InvalidSystem => "시스템 오류",
            ApiResultCode::FailedToSerialize => "타입 변환 오류 (Serialization)",
            ApiResultCode::FailedToDeserialize => "타입 변환 오류 (Deserialization)",
            ApiResultCode::InvalidEtc => "기타 오류",
            ApiResultCode::InvalidNetwork => "네트워크 오류",
            ApiResultCode::ExhaustedRetries => "최대 재시도 횟수 초과",
            ApiResultCode::ConnectionFail => "TCP 연결 실패",
            ApiResultCode::ConnectionTimeout => "연결 시간 초과",
            ApiResultCode::UnknownStatus => "알 수 없는 상태",
        }
    }
}

/// The outcome of one exchange attempt.
///
/// Values are assembled with the `with_*` methods and are read-only once they
/// are attached to a response envelope or carried by a
/// [`ClassifiedFailure`](crate::ClassifiedFailure).
///
/// # Examples
///
/// ```
/// use outcall::{ApiResult, ApiResultCode};
/// use http::StatusCode;
///
/// let result = ApiResult::from_status(Some(StatusCode::BAD_GATEWAY), None)
///     .with_failure_message("Failed to call API. Status Code: [502] Bad Gateway")
///     .with_failure_detail("upstream closed the connection");
///
/// assert_eq!(result.result_code(), ApiResultCode::InvalidResponse);
/// assert!(!result.is_success());
///
/// // Diagnostic detail is dropped before crossing an untrusted boundary.
/// assert!(result.redacted().failure_detail().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResult {
    status: Option<StatusCode>,
    response_headers: Option<HeaderMap>,
    result_code: ApiResultCode,
    failure_message: Option<String>,
    failure_detail: Option<String>,
}

impl ApiResult {
    /// Creates a result with the given code and nothing else.
    pub fn new(result_code: ApiResultCode) -> Self {
        Self {
            status: None,
            response_headers: None,
            result_code,
            failure_message: None,
            failure_detail: None,
        }
    }

    /// Creates a result classified from an HTTP status.
    pub fn from_status(status: Option<StatusCode>, response_headers: Option<HeaderMap>) -> Self {
        Self {
            status,
            response_headers,
            result_code: ApiResultCode::from_status(status),
            failure_message: None,
            failure_detail: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_response_headers(mut self, headers: Option<HeaderMap>) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn with_failure_detail(mut self, detail: impl Into<String>) -> Self {
        self.failure_detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn response_headers(&self) -> Option<&HeaderMap> {
        self.response_headers.as_ref()
    }

    pub fn result_code(&self) -> ApiResultCode {
        self.result_code
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.failure_detail.as_deref()
    }

    /// Returns `true` only for [`ApiResultCode::Success`].
    pub fn is_success(&self) -> bool {
        self.result_code == ApiResultCode::Success
    }

    pub fn code(&self) -> &'static str {
        self.result_code.code()
    }

    pub fn message(&self) -> &'static str {
        self.result_code.message()
    }

    pub fn message_ko(&self) -> &'static str {
        self.result_code.message_ko()
    }

    /// Returns a copy without `failure_detail`.
    ///
    /// The detail may hold raw response bodies or internal error chains, so it
    /// should be stripped before a result is returned to an untrusted caller.
    pub fn redacted(&self) -> Self {
        Self {
            failure_detail: None,
            ..self.clone()
        }
    }
}

#[derive(Serialize)]
struct ApiResultView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_headers: Option<BTreeMap<&'a str, Vec<&'a str>>>,
    result_code: ApiResultCode,
    code: &'static str,
    message: &'static str,
    message_ko: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_detail: Option<&'a str>,
}

impl Serialize for ApiResult {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Header values that are not visible ASCII are left out.
        let response_headers = self.response_headers.as_ref().map(|headers| {
            headers
                .keys()
                .map(|name| {
                    let values = headers
                        .get_all(name)
                        .iter()
                        .filter_map(|value| value.to_str().ok())
                        .collect();
                    (name.as_str(), values)
                })
                .collect()
        });

        ApiResultView {
            status: self.status.map(|s| s.as_u16()),
            response_headers,
            result_code: self.result_code,
            code: self.code(),
            message: self.message(),
            message_ko: self.message_ko(),
            failure_message: self.failure_message.as_deref(),
            failure_detail: self.failure_detail.as_deref(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn code_for(status: u16) -> ApiResultCode {
        ApiResultCode::from_status(Some(StatusCode::from_u16(status).unwrap()))
    }

    #[test]
    fn test_success_statuses() {
        for status in [100, 200, 201, 204, 301, 302, 304] {
            assert_eq!(code_for(status), ApiResultCode::Success, "status {}", status);
        }
    }

    #[test]
    fn test_auth_and_parameter_statuses() {
        assert_eq!(code_for(400), ApiResultCode::InvalidParameter);
        assert_eq!(code_for(401), ApiResultCode::InvalidAuth);
        assert_eq!(code_for(403), ApiResultCode::InvalidAuth);
    }

    #[test]
    fn test_other_error_statuses() {
        for status in [404, 405, 409, 429, 500, 502, 503, 504] {
            assert_eq!(
                code_for(status),
                ApiResultCode::InvalidResponse,
                "status {}",
                status
            );
        }
    }

    #[test]
    fn test_unknown_statuses() {
        assert_eq!(ApiResultCode::from_status(None), ApiResultCode::UnknownStatus);
        assert_eq!(code_for(600), ApiResultCode::UnknownStatus);
        assert_eq!(code_for(999), ApiResultCode::UnknownStatus);
    }

    #[test]
    fn test_is_success_follows_code() {
        assert!(ApiResult::new(ApiResultCode::Success).is_success());
        assert!(!ApiResult::new(ApiResultCode::UnknownStatus).is_success());
        assert!(!ApiResult::from_status(Some(StatusCode::NOT_FOUND), None).is_success());
    }

    #[test]
    fn test_messages_in_both_locales() {
        let result = ApiResult::new(ApiResultCode::ConnectionTimeout);
        assert_eq!(result.code(), "1104");
        assert_eq!(result.message(), "Connection timeout");
        assert_eq!(result.message_ko(), "연결 시간 초과");
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let mut headers = HeaderMap::new();
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));

        let result = ApiResult::from_status(Some(StatusCode::BAD_REQUEST), Some(headers))
            .with_failure_message("bad");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], 400);
        assert_eq!(json["result_code"], "INVALID_PARAMETER");
        assert_eq!(json["code"], "1000");
        assert_eq!(json["failure_message"], "bad");
        assert_eq!(json["response_headers"]["x-trace"], serde_json::json!(["a", "b"]));
        assert!(json.get("failure_detail").is_none());
    }

    #[test]
    fn test_exhausted_code_keeps_wire_name() {
        let json = serde_json::to_value(ApiResultCode::ExhaustedRetries).unwrap();
        assert_eq!(json, "EXHAUSTED_RETIRES");

        for code in [
            ApiResultCode::Success,
            ApiResultCode::InvalidEtc,
            ApiResultCode::ExhaustedRetries,
            ApiResultCode::UnknownStatus,
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), code.name());
        }
    }

    #[test]
    fn test_redacted_drops_only_detail() {
        let result = ApiResult::new(ApiResultCode::InvalidSystem)
            .with_failure_message("boom")
            .with_failure_detail("Cause: stack");
        let redacted = result.redacted();

        assert_eq!(redacted.failure_message(), Some("boom"));
        assert_eq!(redacted.failure_detail(), None);
        assert_eq!(redacted.result_code(), ApiResultCode::InvalidSystem);
    }
}
