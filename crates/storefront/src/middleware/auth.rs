//! Authentication extractors.
//!
//! A visitor is signed in when both the token cookie and the session profile
//! are present, agree on the customer id and the token has not expired.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::cookies::{guest_cart_id, session_token};
use crate::models::{CurrentCustomer, session_keys};
use crate::services::cart::CartIdentity;

/// Extractor that requires a signed-in customer.
///
/// API requests are rejected with 401; page requests are redirected to the
/// login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", customer.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when authentication is required but the customer is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({"error": "Please sign in to continue."})),
            )
                .into_response(),
        }
    }
}

/// Resolve the signed-in customer from the session and token cookie.
async fn current_customer(parts: &Parts) -> Option<CurrentCustomer> {
    let token = session_token(&parts.headers).filter(|t| !t.is_expired())?;
    let session = parts.extensions.get::<Session>()?;

    let customer: CurrentCustomer = session
        .get(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()?;

    if customer.id != token.user_id {
        tracing::warn!(
            session_customer = %customer.id,
            token_user = %token.user_id,
            "Session and token disagree, treating as signed out"
        );
        return None;
    }

    Some(customer)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_customer(parts).await.map(Self).ok_or_else(|| {
            if parts.uri.path().starts_with("/api/") {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if the customer is not logged in.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_customer(parts).await))
    }
}

/// Extractor resolving whose cart a request addresses.
///
/// Signed-in customers own the cart matched by their customer id; everyone
/// else owns the guest cart named in the guest cookie, if any.
pub struct CartOwner {
    pub identity: CartIdentity,
    pub customer: Option<CurrentCustomer>,
}

impl<S> FromRequestParts<S> for CartOwner
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = current_customer(parts).await;
        let identity = customer.as_ref().map_or_else(
            || CartIdentity::Guest(guest_cart_id(&parts.headers)),
            |c| CartIdentity::Customer(c.id),
        );
        Ok(Self { identity, customer })
    }
}

/// Helper to set the current customer in the session.
///
/// The session id is cycled first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Helper to clear the current customer from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
