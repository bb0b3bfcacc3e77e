//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use marketstall_core::CustomerId;

/// Session-stored customer identity.
///
/// Minimal profile kept next to the token cookie so pages can greet the
/// customer without a backend round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Commerce customer id (same as the WordPress user id).
    pub id: CustomerId,
    /// Email address as reported by the auth site.
    pub email: String,
    /// Name to show in the header.
    pub display_name: String,
}

impl CurrentCustomer {
    /// Name for greetings, falling back to the email's local part.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.email.split('@').next().unwrap_or(&self.email)
        } else {
            &self.display_name
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_name_falls_back_to_email() {
        let mut customer = CurrentCustomer {
            id: CustomerId::new(3),
            email: "grace@example.com".to_string(),
            display_name: " ".to_string(),
        };
        assert_eq!(customer.greeting_name(), "grace");

        customer.display_name = "Grace H.".to_string();
        assert_eq!(customer.greeting_name(), "Grace H.");
    }
}
