//! HTML error pages.
//!
//! API handlers answer with [`crate::error::AppError`] JSON; page handlers
//! render these instead so visitors stay inside the site layout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use super::views::PageMeta;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub meta: PageMeta,
    pub heading: String,
    pub message: String,
}

fn error_page(mut meta: PageMeta, status: StatusCode, heading: &str, message: &str) -> Response {
    meta.title = heading.to_string();
    (
        status,
        ErrorTemplate {
            meta,
            heading: heading.to_string(),
            message: message.to_string(),
        },
    )
        .into_response()
}

/// 404 page.
pub fn not_found_page(meta: PageMeta) -> Response {
    error_page(
        meta,
        StatusCode::NOT_FOUND,
        "Page not found",
        "We couldn't find what you were looking for.",
    )
}

/// 502 page for backend outages.
pub fn unavailable_page(meta: PageMeta) -> Response {
    error_page(
        meta,
        StatusCode::BAD_GATEWAY,
        "Something went wrong",
        "The shop is having trouble right now. Please try again in a moment.",
    )
}

/// Fallback for unknown paths.
pub async fn fallback(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    uri: Uri,
) -> Response {
    if uri.path().starts_with("/api/") {
        return crate::error::AppError::NotFound(uri.path().to_string()).into_response();
    }
    let meta = PageMeta::new(state.config(), "Page not found", "", uri.path())
        .with_customer(auth.as_ref());
    not_found_page(meta)
}
