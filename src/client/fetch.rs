//! Shared request path for fetch triggers and verb helpers.
//!
//! [`FetchClient`] turns a URL template, route parameters and merged options
//! into an [`HttpRequest`], hands it to the configured [`Transport`], and
//! returns the raw [`FetchResponse`]. It never touches route state; that is
//! the job of the triggers in [`crate::client::actions`].
//!
//! # Examples
//!
//! ```ignore
//! use router_fetch::client::FetchClient;
//! use router_fetch::protocol::RequestOptions;
//! use router_fetch::RouteParams;
//!
//! let client = FetchClient::new();
//! let params = RouteParams::from([("id".to_string(), "42".to_string())]);
//! let response = client
//!     .send("https://api.example.com/foos/:id", &params, RequestOptions::new())
//!     .await?;
//! println!("Status: {}", response.status);
//! ```

use crate::client::config::ClientConfig;
use crate::client::transport::{FetchResponse, HttpRequest, ReqwestTransport, Transport};
use crate::error::Result;
use crate::protocol::{self, constants, RequestOptions};
use crate::types::RouteParams;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of a verb helper call.
///
/// The body has already been decoded by the time this is returned. A decode
/// failure does not fail the call itself; it shows up in `data`.
#[derive(Debug)]
pub struct ActionResult {
    /// The raw response.
    pub response: FetchResponse,
    /// The body decoded as JSON.
    pub data: Result<Value>,
}

impl ActionResult {
    pub(crate) fn from_response(response: FetchResponse) -> Self {
        let data = response.json_value();
        Self { response, data }
    }
}

/// Resolves templates and sends requests through a [`Transport`].
///
/// Cloning is cheap and shares the transport.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl FetchClient {
    /// Create a client backed by reqwest with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client backed by reqwest with custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::with_config(config.clone()));
        Self::with_transport(config, transport)
    }

    /// Create a client that sends through a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        FetchClient {
            transport,
            config: Arc::new(config),
        }
    }

    /// Resolve `template` against `params` and send it with `options`.
    ///
    /// Relative templates are joined onto [`ClientConfig::base_url`] first.
    pub async fn send(
        &self,
        template: &str,
        params: &RouteParams,
        options: RequestOptions,
    ) -> Result<FetchResponse> {
        let absolute = protocol::absolutize(self.config.base_url.as_deref(), template)?;
        let url = protocol::resolve(&absolute, params)?;
        let request = HttpRequest::from_options(url, &options);

        if self.config.enable_logging {
            tracing::debug!(method = %request.method, url = %request.url, "sending request");
        }

        let response = self.transport.send(request).await;

        if self.config.enable_logging {
            match &response {
                Ok(response) => tracing::debug!(
                    status = response.status,
                    url = %response.url,
                    "received response"
                ),
                Err(e) => tracing::debug!(error = %e, template, "request failed"),
            }
        }

        response
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Base options every request starts from: the method and a JSON content type.
pub(crate) fn default_options(method: &str) -> RequestOptions {
    RequestOptions::new()
        .with_method(method)
        .with_header(constants::headers::CONTENT_TYPE, constants::APPLICATION_JSON)
}
