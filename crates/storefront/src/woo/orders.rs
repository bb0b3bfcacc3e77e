//! Order endpoints, including orders acting as carts.

use tracing::instrument;

use marketstall_core::{CustomerId, OrderId, OrderStatus};

use super::CommerceError;
use super::client::CommerceClient;
use super::types::{NewOrder, Order, OrderPatch};
use crate::services::cart::OrderBackend;

/// Orders shown on the account page.
const ORDER_HISTORY_LIMIT: u32 = 20;

impl CommerceClient {
    /// Recent orders placed by a customer, newest first. Carts are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(customer_id = %customer))]
    pub async fn list_customer_orders(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<Order>, CommerceError> {
        let query = [
            ("customer", customer.to_string()),
            ("per_page", ORDER_HISTORY_LIMIT.to_string()),
            ("orderby", "date".to_string()),
            ("order", "desc".to_string()),
        ];
        let orders: Vec<Order> = self.get("orders", &query).await?;
        Ok(orders
            .into_iter()
            .filter(|o| !o.status.is_cart() && o.status != OrderStatus::CheckoutDraft)
            .collect())
    }
}

impl OrderBackend for CommerceClient {
    #[instrument(skip(self), fields(customer_id = %customer))]
    async fn find_customer_cart(
        &self,
        customer: CustomerId,
    ) -> Result<Option<Order>, CommerceError> {
        let query = [
            ("customer", customer.to_string()),
            ("status", OrderStatus::ShoppingCart.as_str().to_string()),
            ("per_page", "1".to_string()),
            ("orderby", "date".to_string()),
            ("order", "desc".to_string()),
        ];
        let orders: Vec<Order> = self.get("orders", &query).await?;
        Ok(orders.into_iter().next())
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        match self.get::<Order>(&format!("orders/{id}"), &[]).await {
            Ok(order) => Ok(Some(order)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, order), fields(lines = order.line_items.len()))]
    async fn create_order(&self, order: &NewOrder) -> Result<Order, CommerceError> {
        self.post("orders", order).await
    }

    #[instrument(skip(self, patch), fields(order_id = %id))]
    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, CommerceError> {
        self.put(&format!("orders/{id}"), patch).await
    }
}
