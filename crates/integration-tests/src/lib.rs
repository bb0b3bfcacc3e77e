//! End-to-end tests for the Marketstall storefront.
//!
//! Each test starts a [`FakeBackend`] standing in for WooCommerce and the
//! WordPress auth plugins, then serves the real storefront router against it
//! on an ephemeral port. Nothing outside the process is contacted.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```

pub mod backend;

use std::net::SocketAddr;

use marketstall_core::CurrencyCode;
use marketstall_storefront::config::{CommerceConfig, StorefrontConfig};
use marketstall_storefront::state::AppState;
use reqwest::{Client, Response, redirect};
use secrecy::SecretString;
use serde_json::Value;
use url::Url;

pub use backend::{FakeBackend, fake_jwt};

/// A running storefront wired to a fake backend.
pub struct TestContext {
    pub backend: FakeBackend,
    /// Storefront base URL, without a trailing slash.
    pub base_url: String,
    /// Client that keeps cookies between requests and does not follow redirects.
    pub client: Client,
}

impl TestContext {
    /// Start a fake backend and a storefront in front of it.
    pub async fn start() -> Self {
        let backend = FakeBackend::start().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront address");
        let base_url = format!("http://{addr}");

        let site_url = Url::parse(&format!("{}/", backend.url())).expect("backend url");
        let config = StorefrontConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            commerce: CommerceConfig {
                site_url: site_url.clone(),
                api_version: "wc/v3".to_string(),
                consumer_key: "ck_integration".to_string(),
                consumer_secret: SecretString::from("cs_integration".to_string()),
            },
            auth_site_url: site_url,
            currency: CurrencyCode::USD,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let state = AppState::new(config).expect("storefront state");
        let app = marketstall_storefront::app(state);
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("storefront server");
        });

        Self {
            backend,
            base_url,
            client: new_client(),
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET` a storefront path.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    /// Send a JSON request to a storefront path.
    pub async fn send_json(&self, method: reqwest::Method, path: &str, body: &Value) -> Response {
        self.client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await
            .expect("JSON request")
    }

    /// `POST` JSON to a storefront path.
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.send_json(reqwest::Method::POST, path, body).await
    }

    /// Sign in through the API with credentials the backend knows.
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.post_json(
            "/api/auth/login",
            &serde_json::json!({"email": email, "password": password}),
        )
        .await
    }
}

/// A cookie-keeping client that leaves redirects to the test.
#[must_use]
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("HTTP client")
}

/// `Set-Cookie` header values on a response.
#[must_use]
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` value for `name`, if the response sets it.
#[must_use]
pub fn find_cookie(response: &Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

/// Whether the response removes cookie `name` (empty value, immediate expiry).
#[must_use]
pub fn removes_cookie(response: &Response, name: &str) -> bool {
    find_cookie(response, name)
        .is_some_and(|c| c.starts_with(&format!("{name}=;")) || c.contains("Max-Age=0"))
}
