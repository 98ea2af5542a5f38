//! HTTP client over the call pipeline.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    callback::{CallContext, Dispatcher, HttpCallbackHandler},
    error::ClassifiedFailure,
    metadata::RequestMetadata,
    pipeline::execute,
    response::ApiResponse,
    result::{ApiResult, ApiResultCode},
    retry::RetryPolicy,
    transport::{ApiRequest, ReqwestTransport, TransportConfig},
    Error, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An HTTP client whose calls always settle into a typed response.
///
/// The client is designed to be reused across multiple requests. It maintains
/// a connection pool and configuration that applies to all requests.
///
/// A call returns `Err` only when it could not be wired up (a missing path
/// variable, an unserializable body). Everything that happens once the request
/// is on its way, failures included, comes back as a response carrying an
/// [`ApiResult`].
///
/// # Examples
///
/// ```no_run
/// use outcall::{ApiResponse, Client, Envelope};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Debug, Default, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .retry_count(3)
///     .retry_delay(Duration::from_millis(500))
///     .build()?;
///
/// let user: Envelope<User> = client.get("/users/123").await?;
/// if user.is_success() {
///     println!("User: {}", user.name);
/// }
///
/// let created: Envelope<User> = client
///     .post("/users", &CreateUser { name: "Alice".to_string() })
///     .await?;
/// println!("{:?}", created.api_result());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: ReqwestTransport,
    base_url: Url,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Makes a typed HTTP request.
    ///
    /// # Type Parameters
    ///
    /// * `Req` - The request body type (must implement `Serialize`)
    /// * `R` - The response envelope type
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifiedFailure`] only when the request cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use outcall::{Client, Envelope, RequestMetadata};
    /// use http::Method;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Search { query: String }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let metadata = RequestMetadata::new(Method::POST, "/search");
    /// let body = Search { query: "rust".to_string() };
    ///
    /// let results: Envelope<Vec<String>> = client.call(metadata, Some(&body)).await?;
    /// println!("Found {} results", results.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<Req, R>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
        R: ApiResponse,
    {
        self.call_with_handler(metadata, body, None).await
    }

    /// Makes a typed HTTP request and reports its lifecycle to `handler`.
    ///
    /// A request that cannot be built is reported through
    /// [`on_error`](HttpCallbackHandler::on_error) before the failure is
    /// returned.
    pub async fn call_with_handler<Req, R>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
        handler: Option<&dyn HttpCallbackHandler<R>>,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
        R: ApiResponse,
    {
        let request = match self.build_request(&metadata, body) {
            Ok(request) => request,
            Err(failure) => {
                tracing::error!(
                    method = %metadata.method,
                    path = %metadata.path,
                    code = failure.result().code(),
                    error = %failure,
                    "Failed to build request"
                );
                let context = CallContext::new(
                    metadata.method.clone(),
                    metadata.template_url(&self.inner.base_url),
                );
                Dispatcher::new(handler, context).fail(&failure);
                return Err(failure);
            }
        };

        let policy = metadata
            .retry_policy
            .as_ref()
            .unwrap_or(&self.inner.retry_policy);

        Ok(execute(&self.inner.transport, &request, policy, handler).await)
    }

    fn build_request<Req>(
        &self,
        metadata: &RequestMetadata,
        body: Option<&Req>,
    ) -> std::result::Result<ApiRequest, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
    {
        let url = metadata.build_url(&self.inner.base_url)?;
        let mut request = ApiRequest::new(metadata.method.clone(), url);

        request.headers = self.inner.default_headers.clone();
        for name in metadata.headers.keys() {
            request.headers.remove(name);
        }
        for (name, value) in &metadata.headers {
            request.headers.append(name, value.clone());
        }
        request.timeout = self.inner.timeout;

        if let Some(body) = body {
            let json = serde_json::to_vec(body).map_err(|e| {
                let result = ApiResult::new(ApiResultCode::FailedToSerialize)
                    .with_failure_message(format!("Failed to serialize request body: {}", e));
                ClassifiedFailure::with_source(result, e)
            })?;
            request
                .headers
                .entry(header::CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("application/json"));
            request.body = Some(json);
        }

        Ok(request)
    }

    /// Makes a GET request to the specified path.
    pub async fn get<R>(&self, path: impl Into<String>) -> std::result::Result<R, ClassifiedFailure>
    where
        R: ApiResponse,
    {
        let metadata = RequestMetadata::new(Method::GET, path);
        self.call::<(), R>(metadata, None).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, R>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
        R: ApiResponse,
    {
        let metadata = RequestMetadata::new(Method::POST, path);
        self.call(metadata, Some(body)).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, R>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
        R: ApiResponse,
    {
        let metadata = RequestMetadata::new(Method::PUT, path);
        self.call(metadata, Some(body)).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<R>(
        &self,
        path: impl Into<String>,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        R: ApiResponse,
    {
        let metadata = RequestMetadata::new(Method::DELETE, path);
        self.call::<(), R>(metadata, None).await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, R>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> std::result::Result<R, ClassifiedFailure>
    where
        Req: Serialize + ?Sized,
        R: ApiResponse,
    {
        let metadata = RequestMetadata::new(Method::PATCH, path);
        self.call(metadata, Some(body)).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use outcall::ClientBuilder;
/// use outcall::transport::TransportConfig;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), outcall::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .retry_count(2)
///     .retry_delay(Duration::from_secs(1))
///     .transport_config(
///         TransportConfig::builder()
///             .connect_timeout(Duration::from_secs(3))
///             .build(),
///     )
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_count: Option<i64>,
    retry_delay: Option<Duration>,
    max_retry_delay: Option<Duration>,
    retry_jitter: bool,
    timeout: Option<Duration>,
    transport_config: TransportConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            retry_count: None,
            retry_delay: None,
            max_retry_delay: None,
            retry_jitter: false,
            timeout: None,
            transport_config: TransportConfig::default(),
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Retries after the first attempt. Zero or negative disables retries.
    pub fn retry_count(mut self, count: i64) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Base delay between retries. Values below 300ms fall back to 1s.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Caps the exponential backoff.
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = Some(delay);
        self
    }

    pub fn retry_jitter(mut self, jitter: bool) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Sets the deadline for each attempt, from sending to reading the body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let transport = ReqwestTransport::new(&self.transport_config)?;

        let mut retry_policy =
            RetryPolicy::new(self.retry_count, self.retry_delay).with_jitter(self.retry_jitter);
        if let Some(max_delay) = self.max_retry_delay {
            retry_policy = retry_policy.with_max_delay(max_delay);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                default_headers: self.default_headers,
                retry_policy,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
