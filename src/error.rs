//! Error types for route-aware fetching.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`FetchError`]. Errors fall into four groups:
//!
//! | Group | Variants | Surfaces from |
//! |-------|----------|---------------|
//! | Network | `Http`, `InvalidUrl`, `InvalidHeader`, `Encode` | transports, verb helpers, URL triggers |
//! | Decoding | `Decode` | URL triggers and [`ActionResult::data`](crate::ActionResult) |
//! | Resolver | `Resolver` | custom resolver triggers |
//! | Store | `Uninitialized`, `UnknownFetch` | state writes and named trigger lookups |
//!
//! A non-2xx status is not an error. The response is recorded and its body is
//! decoded like any other.

use crate::types::RouteKey;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors produced while resolving, executing, or recording route fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed to complete the request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A URL template could not be parsed, even after joining a configured base URL.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending template or joined URL.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// A header name or value was rejected by the transport.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// A request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A custom resolver function failed.
    #[error(transparent)]
    Resolver(#[from] anyhow::Error),

    /// A state write targeted a route whose state was never initialized.
    #[error("no state initialized for route '{0}'")]
    Uninitialized(RouteKey),

    /// A named write or trigger referenced a name the route does not declare.
    #[error("route '{key}' has no fetch named '{name}'")]
    UnknownFetch {
        /// Route the lookup was made against.
        key: RouteKey,
        /// Name that was not found (empty for a single-slot lookup on a named route).
        name: String,
    },
}

impl FetchError {
    /// Whether this error came from the network boundary rather than from
    /// decoding, a resolver, or the store.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::Http(_)
                | FetchError::InvalidUrl { .. }
                | FetchError::InvalidHeader(_)
                | FetchError::Encode(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}
