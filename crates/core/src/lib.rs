//! Marketstall Core - Shared domain types.
//!
//! This crate provides the types used by the storefront and its tests:
//! typed identifiers for backend resources, validated email addresses,
//! money arithmetic for cart lines, and order statuses.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Orders, products and customers are owned by the external commerce
//! backend; these types describe what the storefront reads and writes.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
