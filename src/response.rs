//! Response envelopes: decoded bodies that always carry an [`ApiResult`].
//!
//! Every type the pipeline can return implements [`ApiResponse`]. The trait
//! requires [`Default`] so that a response can be built without a body: an
//! empty successful body and every failure path produce `Default::default()`
//! with the outcome attached.
//!
//! [`Envelope`] wraps any `DeserializeOwned + Default` type, and [`StringBody`]
//! keeps the raw body text when no structure is needed.

use crate::error::{BoxError, ClassifiedFailure};
use crate::result::{ApiResult, ApiResultCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

/// How the classifier reads a successful body for a response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Decode the body as JSON with [`ApiResponse::decode`].
    Json,
    /// Hand the body text to [`ApiResponse::from_text`].
    Text,
}

/// A decodable response type that carries an [`ApiResult`].
///
/// # Examples
///
/// Most callers wrap their data in [`Envelope`]. Implementing the trait by
/// hand looks like this:
///
/// ```
/// use outcall::{ApiResponse, ApiResult};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct UserResponse {
///     id: u64,
///     name: String,
///     #[serde(skip)]
///     api_result: Option<ApiResult>,
/// }
///
/// impl ApiResponse for UserResponse {
///     fn api_result(&self) -> Option<&ApiResult> {
///         self.api_result.as_ref()
///     }
///
///     fn set_api_result(&mut self, result: ApiResult) {
///         self.api_result = Some(result);
///     }
/// }
///
/// let user = UserResponse::decode(r#"{"id": 7, "name": "kim"}"#).unwrap();
/// assert_eq!(user.id, 7);
/// assert!(!user.is_success()); // no result attached yet
/// ```
pub trait ApiResponse: DeserializeOwned + Default + Send + 'static {
    /// How successful bodies are read for this type.
    const BODY_FORMAT: BodyFormat = BodyFormat::Json;

    fn api_result(&self) -> Option<&ApiResult>;

    fn set_api_result(&mut self, result: ApiResult);

    /// Derived from the attached result; `false` when none is attached.
    fn is_success(&self) -> bool {
        self.api_result().is_some_and(ApiResult::is_success)
    }

    /// Decodes a non-blank JSON body.
    fn decode(body: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Builds the response from raw body text. Only called when
    /// [`BODY_FORMAT`](Self::BODY_FORMAT) is [`BodyFormat::Text`].
    fn from_text(body: String) -> std::result::Result<Self, BoxError> {
        let _ = body;
        Err(format!(
            "{} does not accept a raw text body",
            std::any::type_name::<Self>()
        )
        .into())
    }
}

/// Builds the default response for `R` carrying `result`.
pub(crate) fn failed_response<R: ApiResponse>(result: ApiResult) -> R {
    let mut response = R::default();
    response.set_api_result(result);
    response
}

/// A response envelope around any JSON-decodable value.
///
/// The body is decoded directly into `data`; the result lives beside it and is
/// never part of the wire format.
///
/// # Examples
///
/// ```
/// use outcall::{ApiResponse, Envelope};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize, PartialEq)]
/// struct Post {
///     id: u32,
///     title: String,
/// }
///
/// let post = Envelope::<Post>::decode(r#"{"id": 1, "title": "hello"}"#).unwrap();
/// assert_eq!(post.title, "hello"); // derefs to the data
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope<T> {
    /// The decoded body.
    pub data: T,
    #[serde(skip)]
    api_result: Option<ApiResult>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            api_result: None,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }

    /// Maps the data, keeping the attached result.
    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        Envelope {
            data: f(self.data),
            api_result: self.api_result,
        }
    }
}

impl<T> ApiResponse for Envelope<T>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    fn api_result(&self) -> Option<&ApiResult> {
        self.api_result.as_ref()
    }

    fn set_api_result(&mut self, result: ApiResult) {
        self.api_result = Some(result);
    }
}

impl<T> AsRef<T> for Envelope<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Envelope<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// An envelope whose body is a JSON array.
pub type ListResponse<E> = Envelope<Vec<E>>;

/// An envelope whose body is a JSON object.
pub type MapResponse<K, V> = Envelope<HashMap<K, V>>;

/// A response that keeps the body as text.
///
/// Useful for endpoints that answer with an empty body, plain text, or JSON
/// the caller wants to inspect before choosing a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringBody {
    body: String,
    #[serde(skip)]
    api_result: Option<ApiResult>,
}

impl StringBody {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            api_result: None,
        }
    }

    /// The body text; empty when the server sent none.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decodes the body text into a structured response, keeping the attached
    /// result. A blank body yields `R::default()`.
    ///
    /// # Errors
    ///
    /// Returns a `FAILED_TO_DESERIALIZE` failure when the text does not decode.
    pub fn parse<R: ApiResponse>(self) -> std::result::Result<R, ClassifiedFailure> {
        let mut parsed = if self.body.trim().is_empty() {
            R::default()
        } else {
            R::decode(&self.body).map_err(|e| {
                conversion_failure::<StringBody, R>(self.api_result.as_ref(), &self.body, e)
            })?
        };
        if let Some(result) = self.api_result {
            parsed.set_api_result(result);
        }
        Ok(parsed)
    }
}

impl ApiResponse for StringBody {
    const BODY_FORMAT: BodyFormat = BodyFormat::Text;

    fn api_result(&self) -> Option<&ApiResult> {
        self.api_result.as_ref()
    }

    fn set_api_result(&mut self, result: ApiResult) {
        self.api_result = Some(result);
    }

    fn from_text(body: String) -> std::result::Result<Self, BoxError> {
        Ok(Self::new(body))
    }
}

/// Re-decodes one response type as another through its JSON form.
///
/// The attached result moves to the converted response.
///
/// # Errors
///
/// When the conversion fails, the returned failure carries the source
/// response's result if it had one; otherwise a `FAILED_TO_DESERIALIZE`
/// result describing the conversion.
///
/// # Examples
///
/// ```
/// use outcall::{convert_response, ApiResponse, ApiResult, Envelope};
/// use std::collections::HashMap;
///
/// let mut raw: Envelope<serde_json::Value> =
///     Envelope::new(serde_json::json!({"a": 1, "b": 2}));
/// raw.set_api_result(ApiResult::from_status(Some(http::StatusCode::OK), None));
///
/// let typed: Envelope<HashMap<String, u32>> = convert_response(raw).unwrap();
/// assert_eq!(typed.data["b"], 2);
/// assert!(typed.is_success());
/// ```
pub fn convert_response<R1, R2>(response: R1) -> std::result::Result<R2, ClassifiedFailure>
where
    R1: ApiResponse + Serialize,
    R2: ApiResponse,
{
    let result = response.api_result().cloned();
    let value = serde_json::to_value(&response).map_err(|e| {
        conversion_failure::<R1, R2>(result.as_ref(), std::any::type_name::<R1>(), e)
    })?;
    let rendered = value.to_string();

    let mut converted = serde_json::from_value::<R2>(value)
        .map_err(|e| conversion_failure::<R1, R2>(result.as_ref(), &rendered, e))?;
    if let Some(result) = result {
        converted.set_api_result(result);
    }
    Ok(converted)
}

fn conversion_failure<R1, R2>(
    existing: Option<&ApiResult>,
    value: &str,
    error: serde_json::Error,
) -> ClassifiedFailure {
    let result = existing.cloned().unwrap_or_else(|| {
        ApiResult::new(ApiResultCode::FailedToDeserialize)
            .with_failure_message(format!(
                "Failed to convert response type. Reason: {}",
                error
            ))
            .with_failure_detail(format!(
                "Response type conversion ({} -> {})\nValue: {}",
                std::any::type_name::<R1>(),
                std::any::type_name::<R2>(),
                value
            ))
    });
    ClassifiedFailure::with_source(result, error)
}
