//! Order status as stored by the commerce backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order status.
///
/// An order in [`OrderStatus::ShoppingCart`] is the visitor's cart. Checkout
/// moves it forward along `shopping-cart -> pending -> processing`; the
/// storefront never moves an order backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    ShoppingCart,
    CheckoutDraft,
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    /// A status registered by a backend plugin that the storefront does not know.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Wire value used in query strings and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShoppingCart => "shopping-cart",
            Self::CheckoutDraft => "checkout-draft",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether an order in this status is still acting as a cart.
    #[must_use]
    pub const fn is_cart(self) -> bool {
        matches!(self, Self::ShoppingCart)
    }

    /// Whether checkout may move an order from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::ShoppingCart, Self::Pending) | (Self::Pending, Self::Processing)
        )
    }

    /// Human-readable label for order history pages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ShoppingCart => "In cart",
            Self::CheckoutDraft => "Draft",
            Self::Pending => "Pending payment",
            Self::Processing => "Processing",
            Self::OnHold => "On hold",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
