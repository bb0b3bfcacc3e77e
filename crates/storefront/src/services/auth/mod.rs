//! Authentication against the WordPress JWT endpoints.
//!
//! Login and refresh go to the JWT auth plugin, password resets to the
//! reset-code plugin, and registration creates a commerce customer before
//! logging in with the new credentials. The storefront stores the returned
//! token in an HTTP-only cookie and never verifies it itself.

mod error;
mod token;

pub use error::AuthError;
pub use token::AuthToken;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use marketstall_core::Email;

use crate::woo::{CommerceClient, CommerceError, Customer, NewCustomer};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const TOKEN_PATH: &str = "wp-json/jwt-auth/v1/token";
const REFRESH_PATH: &str = "wp-json/jwt-auth/v1/token/refresh";
const RESET_REQUEST_PATH: &str = "wp-json/bdpwr/v1/reset-password";
const RESET_CONFIRM_PATH: &str = "wp-json/bdpwr/v1/set-password";

/// Backend error code for a duplicate registration.
const EMAIL_EXISTS_CODE: &str = "registration-error-email-exists";

/// Details for a new account.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: AuthToken,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    user_email: String,
    #[serde(default)]
    user_display_name: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ResetRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetConfirm<'a> {
    email: &'a str,
    code: &'a str,
    password: &'a str,
}

/// Client for the auth site.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    site_url: Url,
    commerce: CommerceClient,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("site_url", &self.inner.site_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// `site_url` must end with a slash so endpoint paths join below it.
    #[must_use]
    pub fn new(site_url: Url, commerce: CommerceClient) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                site_url,
                commerce,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.inner
            .site_url
            .join(path)
            .map_err(|e| AuthError::Upstream(format!("invalid auth URL: {e}")))
    }

    /// POST JSON and return the status plus body text.
    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<(reqwest::StatusCode, String), AuthError> {
        let mut request = self.inner.client.post(self.endpoint(path)?).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    fn parse<T: DeserializeOwned>(text: &str) -> Result<T, AuthError> {
        serde_json::from_str(text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse auth site response"
            );
            AuthError::Upstream("unexpected response from auth site".to_string())
        })
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Exchange a username or email and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the auth site rejects the
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, AuthError> {
        let (status, text) = self
            .post_json(
                TOKEN_PATH,
                &Credentials {
                    username: username.trim(),
                    password,
                },
                None,
            )
            .await?;

        if status.is_client_error() {
            tracing::info!(status = %status, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Auth site returned non-success status"
            );
            return Err(AuthError::Upstream(format!("login failed with HTTP {status}")));
        }

        let response: TokenResponse = Self::parse(&text)?;
        let token = AuthToken::decode(&response.token)?;
        tracing::info!(user_id = %token.user_id, "Login succeeded");

        Ok(LoginSuccess {
            token,
            email: response.user_email,
            display_name: response.user_display_name,
        })
    }

    /// Ask the auth site for a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the auth site refuses to
    /// refresh; callers treat this as "keep the old token".
    #[instrument(skip(self, token), fields(user_id = %token.user_id))]
    pub async fn refresh(&self, token: &AuthToken) -> Result<AuthToken, AuthError> {
        let (status, text) = self
            .post_json(REFRESH_PATH, &serde_json::json!({}), Some(&token.token))
            .await?;

        if !status.is_success() {
            tracing::debug!(status = %status, "Token refresh refused");
            return Err(AuthError::InvalidToken);
        }

        let response: TokenResponse = Self::parse(&text)?;
        let refreshed = AuthToken::decode(&response.token)?;
        if refreshed.user_id != token.user_id {
            return Err(AuthError::InvalidToken);
        }
        Ok(refreshed)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Create a customer account and log in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::WeakPassword`] for short passwords and
    /// [`AuthError::AccountExists`] if the email is already registered.
    #[instrument(skip(self, request))]
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<(Customer, LoginSuccess), AuthError> {
        validate_password(&request.password)?;

        let new_customer = NewCustomer {
            email: request.email.as_str().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            username: None,
            password: request.password.clone(),
        };

        let customer = self
            .inner
            .commerce
            .create_customer(&new_customer)
            .await
            .map_err(|e| match e {
                CommerceError::Api { code, .. } if code == EMAIL_EXISTS_CODE => {
                    AuthError::AccountExists
                }
                other => AuthError::Commerce(other),
            })?;
        tracing::info!(customer_id = %customer.id, "Customer registered");

        let login = self
            .login(request.email.as_str(), &request.password)
            .await?;
        Ok((customer, login))
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Ask the auth site to email a reset code.
    ///
    /// Always succeeds from the caller's point of view so the response does
    /// not reveal whether the address has an account.
    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &Email) {
        match self
            .post_json(
                RESET_REQUEST_PATH,
                &ResetRequest {
                    email: email.as_str(),
                },
                None,
            )
            .await
        {
            Ok((status, _)) if status.is_success() => {
                tracing::info!("Password reset code requested");
            }
            Ok((status, _)) => {
                tracing::info!(status = %status, "Password reset request not accepted");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Password reset request failed");
            }
        }
    }

    /// Set a new password using an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetCode`] if the code is wrong or
    /// expired and [`AuthError::WeakPassword`] for short passwords.
    #[instrument(skip(self, email, code, password))]
    pub async fn reset_password(
        &self,
        email: &Email,
        code: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        validate_password(password)?;

        let (status, text) = self
            .post_json(
                RESET_CONFIRM_PATH,
                &ResetConfirm {
                    email: email.as_str(),
                    code: code.trim(),
                    password,
                },
                None,
            )
            .await?;

        if status.is_client_error() {
            return Err(AuthError::InvalidResetCode);
        }
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Auth site returned non-success status"
            );
            return Err(AuthError::Upstream(format!(
                "password reset failed with HTTP {status}"
            )));
        }
        Ok(())
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password("ünïcödé!").is_ok());
    }

    #[test]
    fn test_token_response_tolerates_missing_profile() {
        let response: TokenResponse = serde_json::from_str(r#"{"token":"a.b.c"}"#).unwrap();
        assert_eq!(response.token, "a.b.c");
        assert!(response.user_display_name.is_empty());
    }
}
