//! Types the storefront keeps in the visitor's session.

pub mod session;

pub use session::{CurrentCustomer, keys as session_keys};
