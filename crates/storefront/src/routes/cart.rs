//! Cart page.
//!
//! The page renders the cart server-side; quantity changes, coupons and
//! checkout go through the JSON API and reload the page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::views::PageMeta;
use crate::error::CART_UNAVAILABLE_MESSAGE;
use crate::filters;
use crate::middleware::CartOwner;
use crate::services::cart::{Cart, PAYMENT_METHOD_TITLE};
use crate::state::AppState;

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub coupons: Vec<String>,
    pub item_count: u32,
    pub subtotal: String,
    pub discount_total: Option<String>,
    pub total_tax: Option<String>,
    pub total: String,
}

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
    pub image: Option<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let nonzero = |amount: &rust_decimal::Decimal| {
            (!amount.is_zero()).then(|| cart.money(amount))
        };
        Self {
            lines: cart
                .lines
                .iter()
                .map(|line| CartLineView {
                    id: line.id.get(),
                    name: line.name.clone(),
                    sku: line.sku.clone(),
                    quantity: line.quantity,
                    unit_price: cart.money(&line.unit_price),
                    subtotal: cart.money(&line.subtotal),
                    image: line.image.clone(),
                })
                .collect(),
            coupons: cart.coupons.clone(),
            item_count: cart.item_count,
            subtotal: cart.money(&cart.subtotal),
            discount_total: nonzero(&cart.discount_total),
            total_tax: nonzero(&cart.total_tax),
            total: cart.money(&cart.total),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub meta: PageMeta,
    pub cart: CartView,
    pub error: Option<String>,
    pub payment_method: &'static str,
    /// Prefilled billing email for signed-in customers.
    pub email: String,
}

/// Display the cart page.
#[instrument(skip(state, owner))]
pub async fn show(State(state): State<AppState>, owner: CartOwner) -> impl IntoResponse {
    let (cart, error) = match state.cart().fetch(owner.identity).await {
        Ok(cart) => (cart, None),
        Err(e) => {
            tracing::error!("Failed to load cart: {e}");
            (Cart::empty(), Some(CART_UNAVAILABLE_MESSAGE.to_string()))
        }
    };

    let meta = PageMeta::new(
        state.config(),
        "Your cart",
        "Review your cart and check out.",
        "/cart",
    )
    .with_customer(owner.customer.as_ref());

    CartShowTemplate {
        meta,
        cart: CartView::from(&cart),
        error,
        payment_method: PAYMENT_METHOD_TITLE,
        email: owner.customer.map(|c| c.email).unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use marketstall_core::{LineItemId, ProductId};

    use super::*;
    use crate::services::cart::CartLine;

    #[test]
    fn test_cart_view_formats_amounts() {
        let cart = Cart {
            lines: vec![CartLine {
                id: LineItemId::new(5),
                product_id: ProductId::new(42),
                variation_id: None,
                name: "Green tea".to_string(),
                sku: "GT-1".to_string(),
                quantity: 3,
                unit_price: Decimal::new(1250, 2),
                subtotal: Decimal::new(3750, 2),
                total: Decimal::new(3750, 2),
                image: None,
            }],
            item_count: 3,
            subtotal: Decimal::new(3750, 2),
            total: Decimal::new(3750, 2),
            ..Cart::default()
        };

        let view = CartView::from(&cart);
        assert_eq!(view.lines[0].unit_price, "$12.50");
        assert_eq!(view.subtotal, "$37.50");
        assert_eq!(view.discount_total, None);
        assert_eq!(view.total_tax, None);
    }
}
