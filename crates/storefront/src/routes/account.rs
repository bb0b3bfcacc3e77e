//! Account route handlers.
//!
//! All routes here require authentication via [`RequireAuth`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use marketstall_core::Price;

use super::views::PageMeta;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::woo::{Address, Order};

/// Order summary for the history table.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub date: String,
    pub status: &'static str,
    pub item_count: i64,
    pub total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.get(),
            date: order
                .date_created
                .map(|d| d.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
            status: order.status.label(),
            item_count: order.line_items.iter().map(|l| l.quantity).sum(),
            total: Price::new(order.total, order.currency.clone()).display(),
        }
    }
}

/// Address display data, one entry per non-empty line.
#[derive(Clone, Default)]
pub struct AddressView {
    pub lines: Vec<String>,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        let name = format!("{} {}", address.first_name, address.last_name);
        let city = format!("{} {} {}", address.city, address.state, address.postcode);
        let lines = [
            name.trim(),
            address.company.trim(),
            address.address_1.trim(),
            address.address_2.trim(),
            city.trim(),
            address.country.trim(),
        ]
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
        Self { lines }
    }
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub meta: PageMeta,
    pub name: String,
    pub email: String,
    pub orders: Vec<OrderView>,
    pub billing: AddressView,
    pub error: Option<String>,
}

/// Display account overview with order history.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> impl IntoResponse {
    let commerce = state.commerce();
    let mut error = None;

    let orders = match commerce.list_customer_orders(customer.id).await {
        Ok(orders) => orders.iter().map(OrderView::from).collect(),
        Err(e) => {
            tracing::error!("Failed to fetch order history: {e}");
            error = Some("We couldn't load your orders right now.".to_string());
            Vec::new()
        }
    };

    let billing = commerce.get_customer(customer.id).await.map_or_else(
        |e| {
            tracing::warn!("Failed to fetch customer profile: {e}");
            AddressView::default()
        },
        |profile| AddressView::from(&profile.billing),
    );

    let meta = PageMeta::new(state.config(), "Your account", "", "/account")
        .with_customer(Some(&customer));

    AccountIndexTemplate {
        meta,
        name: customer.greeting_name().to_string(),
        email: customer.email.clone(),
        orders,
        billing,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_view_skips_blank_lines() {
        let address = Address {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address_1: "12 Analytical Row".to_string(),
            city: "London".to_string(),
            postcode: "N1 9GU".to_string(),
            country: "GB".to_string(),
            ..Address::default()
        };
        let view = AddressView::from(&address);
        assert_eq!(
            view.lines,
            vec!["Ada Lovelace", "12 Analytical Row", "London N1 9GU", "GB"]
        );
    }
}
