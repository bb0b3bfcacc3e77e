//! Authentication pages.
//!
//! The forms submit to the JSON endpoints under `/api/auth`; these handlers
//! only render them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::views::PageMeta;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

/// Query parameters for the reset form, as linked from the reset email.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub email: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub meta: PageMeta,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub meta: PageMeta,
    pub min_password_length: usize,
}

/// Forgot and reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub meta: PageMeta,
    pub email: String,
    pub min_password_length: usize,
}

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> Response {
    if auth.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        meta: PageMeta::new(
            state.config(),
            "Sign in",
            "Sign in to your account.",
            "/auth/login",
        ),
    }
    .into_response()
}

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> Response {
    if auth.is_some() {
        return Redirect::to("/account").into_response();
    }
    RegisterTemplate {
        meta: PageMeta::new(
            state.config(),
            "Create an account",
            "Create an account to track your orders.",
            "/auth/register",
        ),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
    .into_response()
}

/// Display the password reset page (request a code, then set a new password).
pub async fn reset_password_page(
    State(state): State<AppState>,
    Query(query): Query<ResetQuery>,
) -> impl IntoResponse {
    ResetPasswordTemplate {
        meta: PageMeta::new(
            state.config(),
            "Reset your password",
            "Reset the password for your account.",
            "/auth/reset-password",
        ),
        email: query.email.unwrap_or_default(),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
}
