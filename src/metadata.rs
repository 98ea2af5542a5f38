//! Request descriptions.

use crate::error::ClassifiedFailure;
use crate::result::{ApiResult, ApiResultCode};
use crate::retry::RetryPolicy;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::collections::HashMap;
use url::Url;

/// Describes a single call: what to send and where.
///
/// The path is relative to the client's base URL and may contain `{name}`
/// placeholders that are filled from [`path_variables`](Self::path_variables).
///
/// # Examples
///
/// ```
/// use outcall::RequestMetadata;
/// use http::Method;
///
/// let metadata = RequestMetadata::new(Method::GET, "/users/{id}/posts")
///     .with_path_variable("id", "42")
///     .with_query_param("tag", "rust")
///     .with_query_param("tag", "http");
///
/// let base = url::Url::parse("https://api.example.com/v1").unwrap();
/// let url = metadata.build_url(&base).unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/v1/users/42/posts?tag=rust&tag=http");
/// ```
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path (relative to the base URL).
    pub path: String,

    /// Values for `{name}` placeholders in the path.
    pub path_variables: HashMap<String, String>,

    /// Query parameters, sent in insertion order. Keys may repeat.
    pub query_params: Vec<(String, String)>,

    /// Headers for this request. They override the client's defaults.
    pub headers: HeaderMap,

    /// Overrides the client's retry policy for this request.
    pub retry_policy: Option<RetryPolicy>,
}

impl RequestMetadata {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_variables: HashMap::new(),
            query_params: Vec::new(),
            headers: HeaderMap::new(),
            retry_policy: None,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Sets the value of the `{name}` placeholder.
    pub fn with_path_variable(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_variables.insert(name.into(), value.to_string());
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// The path with every placeholder filled in.
    ///
    /// # Errors
    ///
    /// Returns an `INVALID_PARAMETER` failure when a placeholder has no value
    /// or is never closed.
    pub fn expand_path(&self) -> Result<String, ClassifiedFailure> {
        let mut expanded = String::with_capacity(self.path.len());
        let mut rest = self.path.as_str();

        while let Some(open) = rest.find('{') {
            expanded.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                invalid_parameter(format!("Unclosed path variable in '{}'", self.path))
            })?;
            let name = &after[..close];
            let value = self
                .path_variables
                .get(name)
                .ok_or_else(|| invalid_parameter(format!("Missing path variable: {}", name)))?;
            // A value is always a single segment.
            expanded.push_str(&value.replace('%', "%25").replace('/', "%2F"));
            rest = &after[close + 1..];
        }
        expanded.push_str(rest);
        Ok(expanded)
    }

    /// Resolves the full request URL against `base`.
    ///
    /// The expanded path is appended to the base URL's path, and query
    /// parameters are appended after any query the base URL already has.
    ///
    /// # Errors
    ///
    /// See [`expand_path`](Self::expand_path).
    pub fn build_url(&self, base: &Url) -> Result<Url, ClassifiedFailure> {
        let path = self.expand_path()?;

        let mut url = base.clone();
        let joined = format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// URL text for a request whose path could not be expanded: the base
    /// joined with the raw path template, without the query.
    pub fn template_url(&self, base: &Url) -> String {
        format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

fn invalid_parameter(message: String) -> ClassifiedFailure {
    ClassifiedFailure::new(ApiResult::new(ApiResultCode::InvalidParameter).with_failure_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    #[test]
    fn test_template_url_keeps_placeholders() {
        let metadata = RequestMetadata::new(Method::GET, "/users/{userId}")
            .with_query_param("page", "2");
        let base = Url::parse("http://localhost:8080/api/").unwrap();

        assert_eq!(
            metadata.template_url(&base),
            "http://localhost:8080/api/users/{userId}"
        );
    }

    #[test]
    fn test_path_variables_are_filled() {
        let metadata = RequestMetadata::new(Method::GET, "/orders/{orderId}/items/{item}")
            .with_path_variable("orderId", 17)
            .with_path_variable("item", "a/b");

        assert_eq!(metadata.expand_path().unwrap(), "/orders/17/items/a%2Fb");
    }

    #[test]
    fn test_missing_path_variable_is_invalid_parameter() {
        let failure = RequestMetadata::new(Method::GET, "/orders/{orderId}")
            .expand_path()
            .unwrap_err();
        assert_eq!(
            failure.result().result_code(),
            ApiResultCode::InvalidParameter
        );
        assert_eq!(failure.to_string(), "Missing path variable: orderId");
    }

    #[test]
    fn test_unclosed_placeholder() {
        let failure = RequestMetadata::new(Method::GET, "/orders/{orderId")
            .expand_path()
            .unwrap_err();
        assert_eq!(
            failure.result().result_code(),
            ApiResultCode::InvalidParameter
        );
    }

    #[test]
    fn test_query_params_keep_order_and_duplicates() {
        let url = RequestMetadata::new(Method::GET, "search")
            .with_query_param("q", "a b")
            .with_query_param("page", "2")
            .with_query_param("q", "c")
            .build_url(&base())
            .unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/search?q=a+b&page=2&q=c");
    }

    #[test]
    fn test_no_query_leaves_url_clean() {
        let url = RequestMetadata::new(Method::GET, "/health")
            .build_url(&base())
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/health");
    }

    #[test]
    fn test_base_path_is_kept() {
        let base = Url::parse("http://localhost:8080/api/v2/").unwrap();
        let url = RequestMetadata::new(Method::GET, "/users")
            .build_url(&base)
            .unwrap();
        assert_eq!(url.path(), "/api/v2/users");
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let err = RequestMetadata::new(Method::GET, "/")
            .with_header("bad header", "x")
            .unwrap_err();
        assert!(matches!(err, crate::Error::ConfigurationError(_)));
    }
}
