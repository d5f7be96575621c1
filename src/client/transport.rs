//! The network boundary.
//!
//! Everything above this module talks to the network through the [`Transport`]
//! trait. [`ReqwestTransport`] is the production implementation; tests and
//! embedders (for example a browser host) can provide their own.

use crate::client::config::ClientConfig;
use crate::error::{FetchError, Result};
use crate::protocol::{constants, Headers, RequestOptions};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A fully prepared request: URL resolved, options merged, body encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method, exactly as configured.
    pub method: String,
    /// Absolute URL with placeholders substituted.
    pub url: String,
    /// Final header map.
    pub headers: Headers,
    /// JSON-encoded body, if any.
    pub body: Option<String>,
    /// Per-request timeout, if any.
    pub timeout: Option<Duration>,
    /// Pass-through options from [`RequestOptions::extra`].
    pub extra: BTreeMap<String, Value>,
}

impl HttpRequest {
    /// Build a request for `url` from merged options.
    pub fn from_options(url: impl Into<String>, options: &RequestOptions) -> Self {
        Self {
            method: options
                .method
                .clone()
                .unwrap_or_else(|| constants::DEFAULT_METHOD.to_string()),
            url: url.into(),
            headers: options.resolved_headers(),
            body: options.body.clone(),
            timeout: options.timeout,
            extra: options.extra.clone(),
        }
    }
}

/// A completed HTTP exchange, as stored in a route's `response` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Response headers, names lower-cased.
    pub headers: Headers,
    /// Raw body.
    pub body: Bytes,
}

impl FetchResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: String::new(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Set the final URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json_value(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body).map_err(FetchError::Decode)
    }

    /// Decode the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.json_value()?).map_err(FetchError::Decode)
    }
}

/// Sends prepared requests. The host's fetch primitive.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. Any non-network outcome, including error
    /// statuses, is a successful [`FetchResponse`].
    async fn send(&self, request: HttpRequest) -> Result<FetchResponse>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_total_connections as usize);

        if !config.proxy_url.is_empty() {
            match reqwest::Proxy::all(&config.proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(proxy_url = %config.proxy_url, error = %e, "ignoring invalid proxy"),
            }
        }

        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to a default HTTP client");
            reqwest::Client::new()
        });

        ReqwestTransport {
            client,
            config: Arc::new(config),
        }
    }

    /// The configuration this transport was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<FetchResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Http(format!("invalid method '{}': {}", request.method, e)))?;

        let mut req_builder = self.client.request(method, &request.url);

        let mut header_map = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidHeader(format!("name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidHeader(format!("value for '{}': {}", name, e)))?;
            header_map.insert(header_name, header_value);
        }
        req_builder = req_builder.headers(header_map);
        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }
        if self.config.enable_logging && !request.extra.is_empty() {
            tracing::trace!(
                url = %request.url,
                options = ?request.extra.keys().collect::<Vec<_>>(),
                "pass-through options have no reqwest equivalent"
            );
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();

        let mut headers = Headers::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            url,
            headers,
            body,
        })
    }
}
