//! Request shaping: URL templates, option merging, and shared constants.
//!
//! Nothing in this module performs I/O. The network side lives in
//! [`crate::client`]; this module only decides *what* will be sent.
//!
//! # Key Items
//!
//! | Item | Description |
//! |------|-------------|
//! | [`resolve`] | Substitute `:name` placeholders in a URL template |
//! | [`absolutize`] | Join a relative template onto a base URL |
//! | [`merge`] | Combine two [`RequestOptions`] with override precedence |
//! | [`HeaderSource`] | Static header map or header-producing function |

mod options;
mod params;

pub use options::{merge, HeaderSource, Headers, RequestOptions};
pub use params::{absolutize, resolve};

/// Protocol constants.
pub mod constants {
    /// Header names.
    pub mod headers {
        /// `Content-Type`, as written on outgoing requests.
        pub const CONTENT_TYPE: &str = "Content-Type";
    }

    /// Media type sent with every request and expected on every response.
    pub const APPLICATION_JSON: &str = "application/json";

    /// Method used by fetch triggers unless configuration says otherwise.
    pub const DEFAULT_METHOD: &str = "GET";
}
