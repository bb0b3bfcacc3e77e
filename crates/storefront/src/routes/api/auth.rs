//! Authentication JSON API.
//!
//! A successful login or registration stores the JWT in the HTTP-only token
//! cookie and the customer's profile in the session. Logging in drops any
//! guest cart cookie; the guest cart stays behind as an abandoned order.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{CustomerId, Email};

use crate::error::{
    AppError, FieldErrors, Result, add_breadcrumb, clear_sentry_user, set_sentry_user,
};
use crate::middleware::cookies::{
    GUEST_CART_COOKIE, SetCookies, TOKEN_COOKIE, removal_cookie, session_token, set_cookies,
    token_cookie,
};
use crate::middleware::{RequireAuth, clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::services::auth::{LoginSuccess, RegisterRequest, validate_password};
use crate::state::AppState;

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or username.
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirm: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Body of `POST /api/auth/forgot-password`.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of `POST /api/auth/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}

/// The signed-in customer as returned to the browser.
#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: CustomerId,
    pub email: String,
    pub display_name: String,
}

impl From<&CurrentCustomer> for CustomerResponse {
    fn from(customer: &CurrentCustomer) -> Self {
        Self {
            id: customer.id,
            email: customer.email.clone(),
            display_name: customer.greeting_name().to_string(),
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Result of a refresh attempt.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
}

/// Store a login in the session and build the cookies that go with it.
async fn start_session(
    state: &AppState,
    session: &Session,
    login: LoginSuccess,
    fallback_email: &str,
) -> Result<(SetCookies, CurrentCustomer)> {
    let email = if login.email.is_empty() {
        fallback_email.to_string()
    } else {
        login.email
    };
    let customer = CurrentCustomer {
        id: login.token.user_id,
        email,
        display_name: login.display_name,
    };
    set_current_customer(session, &customer).await?;
    set_sentry_user(&customer.id, Some(&customer.email));

    let secure = state.config().secure_cookies();
    let cookies = set_cookies([
        token_cookie(&login.token, secure),
        removal_cookie(GUEST_CART_COOKIE, secure),
    ]);
    Ok((cookies, customer))
}

/// Log in with email (or username) and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<(SetCookies, Json<CustomerResponse>)> {
    let mut errors = FieldErrors::new();
    if request.email.trim().is_empty() {
        errors.add("email", "This field is required.");
    }
    if request.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let login = state.auth().login(&request.email, &request.password).await?;
    let (cookies, customer) =
        start_session(&state, &session, login, request.email.trim()).await?;

    add_breadcrumb("auth", "Logged in", None);
    Ok((cookies, Json(CustomerResponse::from(&customer))))
}

/// Create an account and log in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, SetCookies, Json<CustomerResponse>)> {
    let mut errors = FieldErrors::new();
    let email = Email::parse(&form.email)
        .map_err(|_| errors.add("email", "Please enter a valid email address."))
        .ok();
    if let Err(e) = validate_password(&form.password) {
        errors.add("password", e.to_string());
    }
    if form
        .password_confirm
        .as_deref()
        .is_some_and(|confirm| confirm != form.password)
    {
        errors.add("password_confirm", "Passwords do not match.");
    }
    errors.into_result()?;
    let email = email.ok_or_else(|| AppError::BadRequest("Invalid email".to_string()))?;

    let (customer, mut login) = state
        .auth()
        .register(RegisterRequest {
            email: email.clone(),
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
        })
        .await?;

    if login.display_name.trim().is_empty() {
        login.display_name = format!("{} {}", customer.first_name, customer.last_name)
            .trim()
            .to_string();
    }
    let (cookies, current) = start_session(&state, &session, login, email.as_str()).await?;

    add_breadcrumb("auth", "Registered", None);
    Ok((
        StatusCode::CREATED,
        cookies,
        Json(CustomerResponse::from(&current)),
    ))
}

/// Request a password reset code by email.
///
/// Answers the same way whether or not the address has an account.
#[instrument(skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = Email::parse(&request.email).map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.add("email", "Please enter a valid email address.");
        AppError::Validation(errors)
    })?;

    state.auth().forgot_password(&email).await;

    Ok(Json(MessageResponse {
        message: "If an account exists for that address, a reset code is on its way.",
    }))
}

/// Set a new password with an emailed reset code.
#[instrument(skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let mut errors = FieldErrors::new();
    let email = Email::parse(&request.email)
        .map_err(|_| errors.add("email", "Please enter a valid email address."))
        .ok();
    if request.code.trim().is_empty() {
        errors.add("code", "This field is required.");
    }
    errors.into_result()?;
    let email = email.ok_or_else(|| AppError::BadRequest("Invalid email".to_string()))?;

    state
        .auth()
        .reset_password(&email, &request.code, &request.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Your password has been reset. You can sign in now.",
    }))
}

/// Try to extend the session token.
///
/// Refusal by the auth site is not an error; the old token stays in place.
#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(SetCookies, Json<RefreshResponse>)> {
    let token = session_token(&headers)
        .filter(|t| !t.is_expired())
        .ok_or_else(|| AppError::Unauthorized("Please sign in to continue.".to_string()))?;

    match state.auth().refresh(&token).await {
        Ok(fresh) => {
            let cookie = token_cookie(&fresh, state.config().secure_cookies());
            Ok((
                set_cookies([cookie]),
                Json(RefreshResponse { refreshed: true }),
            ))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token refresh skipped");
            Ok((set_cookies(None), Json(RefreshResponse { refreshed: false })))
        }
    }
}

/// Sign out: drop the session and both cookies.
#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, SetCookies)> {
    clear_current_customer(&session).await?;
    clear_sentry_user();

    let secure = state.config().secure_cookies();
    Ok((
        StatusCode::NO_CONTENT,
        set_cookies([
            removal_cookie(TOKEN_COOKIE, secure),
            removal_cookie(GUEST_CART_COOKIE, secure),
        ]),
    ))
}

/// The signed-in customer.
pub async fn me(RequireAuth(customer): RequireAuth) -> Json<CustomerResponse> {
    Json(CustomerResponse::from(&customer))
}
