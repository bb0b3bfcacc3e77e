//! WooCommerce REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with `reqwest`, authenticated with the consumer
//!   key/secret pair as HTTP basic auth
//! - The backend is the source of truth - NO local sync, direct API calls
//! - Catalogue reads are cached in memory via `moka` (5 minute TTL); orders,
//!   reviews and customers are always fetched fresh
//!
//! # Example
//!
//! ```rust,ignore
//! use marketstall_storefront::woo::{CommerceClient, ProductQuery};
//!
//! let client = CommerceClient::new(&config.commerce)?;
//! let page = client.list_products(&ProductQuery::default()).await?;
//! let product = client.get_product_by_slug("green-tea").await?;
//! ```

mod cache;
mod client;
mod customers;
mod orders;
mod products;
mod reviews;
pub mod types;

pub use client::CommerceClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend error code, e.g. `woocommerce_rest_invalid_id`.
        code: String,
        /// Backend error message.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CommerceError {
    /// Whether the error means the requested resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Error envelope returned by the backend on failure.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
