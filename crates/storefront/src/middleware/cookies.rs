//! Cookies the storefront sets besides the session cookie.
//!
//! - `ms_token` - HTTP-only JWT from the auth site
//! - `ms_guest_cart` - order id of a guest's cart

use axum::http::{HeaderMap, HeaderName, header};
use axum::response::AppendHeaders;
use chrono::Utc;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use marketstall_core::OrderId;

use crate::services::auth::AuthToken;

/// Session token cookie name.
pub const TOKEN_COOKIE: &str = "ms_token";

/// Guest cart cookie name.
pub const GUEST_CART_COOKIE: &str = "ms_guest_cart";

/// Token cookie lifetime when the token has no expiry claim (7 days).
const TOKEN_DEFAULT_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Guest cart cookie lifetime (30 days).
const GUEST_CART_MAX_AGE: i64 = 30 * 24 * 60 * 60;

/// `Set-Cookie` headers for a response.
pub type SetCookies = AppendHeaders<Vec<(HeaderName, String)>>;

/// Turn cookies into `Set-Cookie` headers.
#[must_use]
pub fn set_cookies(cookies: impl IntoIterator<Item = Cookie<'static>>) -> SetCookies {
    AppendHeaders(
        cookies
            .into_iter()
            .map(|c| (header::SET_COOKIE, c.to_string()))
            .collect(),
    )
}

/// Read a cookie value from the request headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// The guest cart id from the request, if present and well formed.
#[must_use]
pub fn guest_cart_id(headers: &HeaderMap) -> Option<OrderId> {
    read_cookie(headers, GUEST_CART_COOKIE).and_then(|v| v.parse().ok())
}

/// The session token from the request, if present and decodable.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<AuthToken> {
    read_cookie(headers, TOKEN_COOKIE).and_then(|v| AuthToken::decode(&v).ok())
}

fn base(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie holding the session token until it expires.
#[must_use]
pub fn token_cookie(token: &AuthToken, secure: bool) -> Cookie<'static> {
    let max_age = token
        .expires_at
        .map_or(TOKEN_DEFAULT_MAX_AGE, |exp| {
            (exp - Utc::now()).num_seconds().max(0)
        });
    let mut cookie = base(TOKEN_COOKIE, token.token.clone(), secure);
    cookie.set_max_age(Duration::seconds(max_age));
    cookie
}

/// Cookie remembering a guest's cart.
#[must_use]
pub fn guest_cart_cookie(order_id: OrderId, secure: bool) -> Cookie<'static> {
    let mut cookie = base(GUEST_CART_COOKIE, order_id.to_string(), secure);
    cookie.set_max_age(Duration::seconds(GUEST_CART_MAX_AGE));
    cookie
}

/// Cookie that deletes `name` in the browser.
#[must_use]
pub fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = base(name, String::new(), secure);
    cookie.make_removal();
    cookie
}
