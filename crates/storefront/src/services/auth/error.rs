//! Authentication error types.

use thiserror::Error;

use crate::woo::CommerceError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marketstall_core::EmailError),

    /// Invalid credentials (wrong password or unknown user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    AccountExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The password reset code was rejected.
    #[error("invalid or expired reset code")]
    InvalidResetCode,

    /// The session token could not be decoded.
    #[error("invalid session token")]
    InvalidToken,

    /// The auth site answered with something unexpected.
    #[error("auth site error: {0}")]
    Upstream(String),

    /// HTTP request to the auth site failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Customer creation failed.
    #[error("commerce error: {0}")]
    Commerce(#[from] CommerceError),
}
