//! The transport boundary.
//!
//! The pipeline never talks to the network itself. It hands an [`ApiRequest`]
//! to a [`Transport`] and receives an [`Exchange`]: a status, the response
//! headers, and a [`Body`] that is read only when the classifier asks for it.
//! [`ReqwestTransport`] is the production implementation.

use crate::error::TransportError;
use http::{HeaderMap, Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// A fully resolved request, ready to be sent as many times as the retry
/// policy asks.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Deadline for the whole exchange, if any.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

type BodyFuture = Pin<Box<dyn Future<Output = Result<Option<String>, TransportError>> + Send>>;

/// A response body that is read on demand.
pub struct Body {
    inner: BodyInner,
}

enum BodyInner {
    Empty,
    Text(String),
    Deferred(BodyFuture),
}

impl Body {
    /// A response without a body.
    pub fn empty() -> Self {
        Self {
            inner: BodyInner::Empty,
        }
    }

    /// A body whose text is already known.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            inner: BodyInner::Text(text.into()),
        }
    }

    /// A body read by `future`. `Ok(None)` means the server sent no body.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<String>, TransportError>> + Send + 'static,
    {
        Self {
            inner: BodyInner::Deferred(Box::pin(future)),
        }
    }

    /// Reads the whole body as text.
    pub async fn read_text(self) -> Result<Option<String>, TransportError> {
        match self.inner {
            BodyInner::Empty => Ok(None),
            BodyInner::Text(text) => Ok(Some(text)),
            BodyInner::Deferred(future) => future.await,
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            BodyInner::Empty => f.write_str("Body::Empty"),
            BodyInner::Text(text) => f.debug_tuple("Body::Text").field(text).finish(),
            BodyInner::Deferred(_) => f.write_str("Body::Deferred"),
        }
    }
}

/// The raw outcome of one round trip.
#[derive(Debug)]
pub struct Exchange {
    /// `None` when the transport could not produce a status.
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Exchange {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status: Some(status),
            headers,
            body,
        }
    }
}

/// Sends requests on behalf of the pipeline.
///
/// Implementations sort their failures into [`TransportError`] variants so the
/// error resolver can classify them without inspecting concrete error types.
///
/// # Examples
///
/// ```
/// use outcall::transport::{ApiRequest, Body, Exchange, Transport};
/// use outcall::TransportError;
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysOk;
///
/// impl Transport for AlwaysOk {
///     async fn send(&self, _request: &ApiRequest) -> Result<Exchange, TransportError> {
///         Ok(Exchange::new(StatusCode::OK, HeaderMap::new(), Body::text("{}")))
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<Exchange, TransportError>> + Send;
}

/// Connection settings for [`ReqwestTransport`].
///
/// # Examples
///
/// ```
/// use outcall::transport::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .max_idle_connections(64)
///     .build();
/// assert_eq!(config.read_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time allowed to establish a connection, TLS handshake included.
    pub connect_timeout: Duration,

    /// Time allowed between reads once connected.
    pub read_timeout: Duration,

    /// Idle connections kept per host.
    pub max_idle_connections: usize,

    /// TCP keepalive interval.
    pub tcp_keepalive: Option<Duration>,

    /// Skip certificate verification. Only for test environments.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_idle_connections: 500,
            tcp_keepalive: Some(Duration::from_secs(300)),
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Default)]
pub struct TransportConfigBuilder {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_idle_connections: Option<usize>,
    tcp_keepalive: Option<Option<Duration>>,
    accept_invalid_certs: Option<bool>,
}

impl TransportConfigBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = Some(max);
        self
    }

    /// Sets the keepalive interval; `None` disables keepalive probes.
    pub fn tcp_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.tcp_keepalive = Some(interval);
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = Some(accept);
        self
    }

    pub fn build(self) -> TransportConfig {
        let default = TransportConfig::default();
        TransportConfig {
            connect_timeout: self.connect_timeout.unwrap_or(default.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(default.read_timeout),
            max_idle_connections: self
                .max_idle_connections
                .unwrap_or(default.max_idle_connections),
            tcp_keepalive: self.tcp_keepalive.unwrap_or(default.tcp_keepalive),
            accept_invalid_certs: self
                .accept_invalid_certs
                .unwrap_or(default.accept_invalid_certs),
        }
    }
}

/// A [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .tcp_keepalive(config.tcp_keepalive)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { http_client })
    }

    /// Wraps an existing client.
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Exchange, TransportError> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        let body = Body::deferred(async move {
            let text = response.text().await?;
            Ok::<_, TransportError>(if text.is_empty() { None } else { Some(text) })
        });

        Ok(Exchange {
            status: Some(status),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_body_variants() {
        assert_eq!(Body::empty().read_text().await.unwrap(), None);
        assert_eq!(
            Body::text("hi").read_text().await.unwrap(),
            Some("hi".to_string())
        );

        let deferred = Body::deferred(async { Ok(Some("later".to_string())) });
        assert_eq!(deferred.read_text().await.unwrap(), Some("later".to_string()));
    }

    #[tokio::test]
    async fn test_deferred_body_error() {
        let body = Body::deferred(async { Err(TransportError::Other("reset by peer".into())) });
        assert!(matches!(
            body.read_text().await,
            Err(TransportError::Other(_))
        ));
    }

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::builder()
            .tcp_keepalive(None)
            .accept_invalid_certs(true)
            .build();

        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_idle_connections, 500);
        assert_eq!(config.tcp_keepalive, None);
        assert!(config.accept_invalid_certs);
    }
}
