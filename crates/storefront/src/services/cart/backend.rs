//! The order resource the cart adapter reads and rewrites.

use std::future::Future;

use marketstall_core::{CustomerId, OrderId};

use crate::woo::{CommerceError, NewOrder, Order, OrderPatch};

/// Order storage used by [`super::CartService`].
///
/// Implemented by [`crate::woo::CommerceClient`]; tests substitute an
/// in-memory store.
pub trait OrderBackend: Send + Sync {
    /// Most recent order in cart status owned by `customer`, if any.
    fn find_customer_cart(
        &self,
        customer: CustomerId,
    ) -> impl Future<Output = Result<Option<Order>, CommerceError>> + Send;

    /// Fetch an order by id. A missing order is `Ok(None)`.
    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, CommerceError>> + Send;

    /// Create an order.
    fn create_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, CommerceError>> + Send;

    /// Apply a partial update to an order and return the refreshed order.
    fn update_order(
        &self,
        id: OrderId,
        patch: &OrderPatch,
    ) -> impl Future<Output = Result<Order, CommerceError>> + Send;
}
