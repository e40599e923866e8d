//! Transports: how an encoded request reaches a server.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use hermes_config::ClientSettings;
use hermes_contract::EncodedRequest;
use hermes_core::{CancellationToken, ContractError};
use hermes_server::Dispatcher;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Request, Response};
use thiserror::Error;

/// Future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = BoxFuture<'a, Result<Response<Bytes>, TransportError>>;

/// A failure below HTTP: no response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response arrived in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The call was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(String),
}

impl From<TransportError> for ContractError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect(_) => Self::unavailable(err.to_string()),
            TransportError::Timeout(_) => Self::timeout(err.to_string()),
            TransportError::Cancelled => Self::cancelled(err.to_string()),
            TransportError::Other(_) => Self::unexpected(err.to_string()),
        }
    }
}

/// Sends encoded requests.
///
/// Implementations return any HTTP response as `Ok`, whatever its status;
/// `Err` means no response was received.
pub trait HttpTransport: Send + Sync {
    /// Sends one request with the given extra headers.
    fn send(&self, request: EncodedRequest, headers: HeaderMap) -> TransportFuture<'_>;
}

/// HTTP transport backed by `reqwest`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hermes_client::ReqwestTransport;
///
/// let transport = ReqwestTransport::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
/// assert_eq!(transport.base_url(), "http://localhost:8080");
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Other` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Creates a transport from client settings.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Other` if the HTTP client cannot be built.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, TransportError> {
        Self::new(settings.base_url.clone(), settings.timeout())
    }

    /// Returns the base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: EncodedRequest, headers: HeaderMap) -> TransportFuture<'_> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, request.path_and_query());
            let mut builder = self.client.request(request.method, &url).headers(headers);
            if let Some(body) = request.body {
                builder = builder
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(body);
            }

            let response = builder.send().await.map_err(classify)?;

            let status = response.status();
            let response_headers = response.headers().clone();
            let body = response.bytes().await.map_err(classify)?;

            let mut out = Response::new(body);
            *out.status_mut() = status;
            *out.headers_mut() = response_headers;
            Ok(out)
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Hands requests to an in-process dispatcher.
///
/// The request goes through the same routing, binding and translation as a
/// networked one, without sockets.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    dispatcher: Arc<Dispatcher>,
}

impl LoopbackTransport {
    /// Creates a transport serving requests with `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Returns the dispatcher behind this transport.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl HttpTransport for LoopbackTransport {
    fn send(&self, request: EncodedRequest, headers: HeaderMap) -> TransportFuture<'_> {
        Box::pin(async move {
            let uri = request.path_and_query();
            let has_body = request.body.is_some();
            let mut inbound = Request::builder()
                .method(request.method)
                .uri(uri)
                .body(request.body.unwrap_or_default())
                .map_err(|e| TransportError::Other(format!("invalid request: {e}")))?;
            *inbound.headers_mut() = headers;
            if has_body {
                inbound
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            // Dropping this future drops the dispatch, so no token is needed
            // for caller-side cancellation.
            Ok(self.dispatcher.dispatch(inbound, CancellationToken::new()).await)
        })
    }
}
