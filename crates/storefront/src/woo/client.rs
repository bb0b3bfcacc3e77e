//! HTTP plumbing shared by every commerce endpoint.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::cache::CacheValue;
use super::{CommerceError, ErrorBody};
use crate::config::CommerceConfig;

/// Pagination totals reported in `X-WP-Total` / `X-WP-TotalPages`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        };
        let total = read("X-WP-Total").unwrap_or(0);
        let total_pages = read("X-WP-TotalPages")
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(0);
        Self { total, total_pages }
    }
}

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the WooCommerce REST API.
///
/// Cheap to clone; all clones share one connection pool and one catalogue
/// cache.
#[derive(Clone)]
pub struct CommerceClient {
    pub(super) inner: Arc<CommerceClientInner>,
}

pub(super) struct CommerceClientInner {
    client: reqwest::Client,
    api_base: Url,
    consumer_key: String,
    consumer_secret: SecretString,
    pub(super) cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("api_base", &self.inner.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured site URL cannot be turned into an
    /// API base URL.
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base()?,
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                cache,
            }),
        })
    }

    /// Drop every cached catalogue entry.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    fn endpoint(&self, path: &str) -> Result<Url, CommerceError> {
        Ok(self.inner.api_base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .header("Accept", "application/json")
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    /// `GET` a resource, returning the body and pagination headers.
    pub(super) async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Pagination), CommerceError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        let (body, headers) = self.execute(self.request(Method::GET, url)).await?;
        Ok((parse_body(&body)?, Pagination::from_headers(&headers)))
    }

    /// `GET` a resource.
    pub(super) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CommerceError> {
        self.get_paged(path, query).await.map(|(body, _)| body)
    }

    /// `POST` a JSON payload.
    pub(super) async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, CommerceError> {
        let url = self.endpoint(path)?;
        let (body, _) = self
            .execute(self.request(Method::POST, url).json(payload))
            .await?;
        parse_body(&body)
    }

    /// `PUT` a JSON payload.
    pub(super) async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, CommerceError> {
        let url = self.endpoint(path)?;
        let (body, _) = self
            .execute(self.request(Method::PUT, url).json(payload))
            .await?;
        parse_body(&body)
    }

    /// Send a request and classify the response.
    async fn execute(&self, request: RequestBuilder) -> Result<(String, HeaderMap), CommerceError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        let headers = response.headers().clone();
        let response_text = response.text().await?;

        if status.is_success() {
            debug!(status = %status, "Commerce API request succeeded");
            return Ok((response_text, headers));
        }

        let envelope = serde_json::from_str::<ErrorBody>(&response_text).ok();

        if status == StatusCode::NOT_FOUND {
            let message = envelope
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "resource not found".to_string());
            return Err(CommerceError::NotFound(message));
        }

        tracing::error!(
            status = %status,
            body = %response_text.chars().take(500).collect::<String>(),
            "Commerce API returned non-success status"
        );

        let (code, message) = envelope.map_or_else(
            || {
                (
                    String::new(),
                    response_text.chars().take(200).collect::<String>(),
                )
            },
            |e| (e.code, e.message),
        );
        Err(CommerceError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, CommerceError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse commerce API response"
        );
        CommerceError::Parse(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_pagination_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-WP-Total", HeaderValue::from_static("37"));
        headers.insert("X-WP-TotalPages", HeaderValue::from_static("4"));

        let pagination = Pagination::from_headers(&headers);
        assert_eq!(pagination.total, 37);
        assert_eq!(pagination.total_pages, 4);
    }

    #[test]
    fn test_pagination_missing_headers() {
        let pagination = Pagination::from_headers(&HeaderMap::new());
        assert_eq!(pagination, Pagination::default());
    }

    #[test]
    fn test_parse_body_error() {
        let result = parse_body::<Vec<u32>>("{not json");
        assert!(matches!(result, Err(CommerceError::Parse(_))));
    }
}
