//! Business logic services for the storefront.
//!
//! - [`cart`] - Cart operations over backend orders
//! - [`auth`] - Login, registration and password resets against the auth site

pub mod auth;
pub mod cart;
