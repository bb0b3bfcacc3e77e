//! JSON API handlers.
//!
//! Thin pass-throughs to the cart service, the auth client and the commerce
//! client. Errors render as `{"error": ...}` via [`crate::error::AppError`].

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod reviews;
pub mod wishlist;
