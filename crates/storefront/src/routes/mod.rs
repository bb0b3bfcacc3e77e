//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                             - Home page
//! GET  /health                       - Health check
//! GET  /sitemap.xml                  - Sitemap
//! GET  /robots.txt                   - Crawler rules
//!
//! # Catalogue
//! GET  /products                     - Product listing (page, category, q, sort)
//! GET  /products/{slug}              - Product detail
//! GET  /categories/{slug}            - Category listing (page, sort)
//!
//! # Cart
//! GET  /cart                         - Cart page with checkout form
//!
//! # Auth pages
//! GET  /auth/login                   - Login form
//! GET  /auth/register                - Registration form
//! GET  /auth/reset-password          - Password reset form
//!
//! # Account (requires auth)
//! GET  /account                      - Account overview and order history
//!
//! # JSON API
//! GET    /api/cart                   - Current cart
//! DELETE /api/cart                   - Clear cart
//! POST   /api/cart/items             - Add item
//! PATCH  /api/cart/items/{line_id}   - Update quantity (<= 0 removes)
//! DELETE /api/cart/items/{line_id}   - Remove line
//! POST   /api/cart/coupons           - Apply coupon
//! POST   /api/checkout               - Place a cash-on-delivery order
//! POST   /api/auth/login             - Login
//! POST   /api/auth/register          - Register and login
//! POST   /api/auth/forgot-password   - Request reset code
//! POST   /api/auth/reset-password    - Set new password with code
//! POST   /api/auth/refresh           - Best-effort token refresh
//! POST   /api/auth/logout            - Logout
//! GET    /api/auth/me                - Current customer
//! GET    /api/wishlist?ids=1,2,3     - Product summaries
//! GET    /api/products/{id}/reviews  - Approved reviews
//! POST   /api/products/{id}/reviews  - Submit review (requires auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod errors;
pub mod home;
pub mod products;
pub mod seo;
pub mod views;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth page routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/reset-password", get(auth::reset_password_page))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart API routes router.
pub fn cart_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api::cart::show).delete(api::cart::clear))
        .route("/items", post(api::cart::add_item))
        .route(
            "/items/{line_id}",
            patch(api::cart::update_item).delete(api::cart::remove_item),
        )
        .route("/coupons", post(api::cart::apply_coupon))
}

/// Create the auth API routes router.
///
/// Credential endpoints get the strict auth rate limit; session endpoints
/// only the general API limit.
pub fn auth_api_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/login", post(api::auth::login))
        .route("/register", post(api::auth::register))
        .route("/forgot-password", post(api::auth::forgot_password))
        .route("/reset-password", post(api::auth::reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/refresh", post(api::auth::refresh))
        .route("/logout", post(api::auth::logout))
        .route("/me", get(api::auth::me))
        .merge(credentials)
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_api_routes())
        .route("/checkout", post(api::checkout::checkout))
        .nest("/auth", auth_api_routes())
        .route("/wishlist", get(api::wishlist::show))
        .route(
            "/products/{id}/reviews",
            get(api::reviews::list).post(api::reviews::create),
        )
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        // Catalogue
        .nest("/products", product_routes())
        .route("/categories/{slug}", get(categories::show))
        // Cart page
        .route("/cart", get(cart::show))
        // Account (auth enforced by the RequireAuth extractor)
        .route("/account", get(account::index))
        // Auth pages
        .nest("/auth", auth_routes())
        // JSON API
        .nest("/api", api_routes())
        .fallback(errors::fallback)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
pub async fn health() -> &'static str {
    "ok"
}
