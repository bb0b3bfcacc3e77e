//! Checkout JSON API.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketstall_core::{Email, OrderId, OrderStatus, Price};

use crate::error::{FieldErrors, Result, add_breadcrumb};
use crate::middleware::CartOwner;
use crate::middleware::cookies::{GUEST_CART_COOKIE, SetCookies, removal_cookie, set_cookies};
use crate::services::cart::CheckoutDetails;
use crate::state::AppState;
use crate::woo::Address;

/// Body of `POST /api/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub billing: Address,
    /// Defaults to the billing address.
    #[serde(default)]
    pub shipping: Option<Address>,
    #[serde(default)]
    pub customer_note: Option<String>,
}

/// A placed order.
#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Formatted total.
    pub total: String,
    pub payment_method: String,
}

/// Check the billing fields a cash-on-delivery order needs.
///
/// Signed-in customers without a billing email get their account email.
fn validate_billing(billing: &mut Address, account_email: Option<&str>) -> Result<()> {
    let mut errors = FieldErrors::new();
    let required = [
        ("billing.first_name", &billing.first_name),
        ("billing.last_name", &billing.last_name),
        ("billing.address_1", &billing.address_1),
        ("billing.city", &billing.city),
        ("billing.postcode", &billing.postcode),
        ("billing.country", &billing.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.add(field, "This field is required.");
        }
    }

    let email = billing
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .or(account_email);
    match email.map(Email::parse) {
        Some(Ok(email)) => billing.email = Some(email.into_inner()),
        Some(Err(_)) => errors.add("billing.email", "Please enter a valid email address."),
        None => errors.add("billing.email", "This field is required."),
    }

    errors.into_result()
}

/// Turn the cart into an order and confirm it for cash on delivery.
///
/// Guests lose their cart cookie once the order is placed.
#[instrument(skip(state, owner, request))]
pub async fn checkout(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(mut request): Json<CheckoutRequest>,
) -> Result<(StatusCode, SetCookies, Json<OrderConfirmation>)> {
    let account_email = owner.customer.as_ref().map(|c| c.email.as_str());
    validate_billing(&mut request.billing, account_email)?;

    let cart = state.cart();
    let pending = cart.convert_to_order(owner.identity).await?;
    let order = cart
        .confirm_order(
            pending.id,
            CheckoutDetails {
                billing: request.billing,
                shipping: request.shipping,
                customer_note: request
                    .customer_note
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
            },
        )
        .await?;

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", &order_id)]));

    let cookies = owner
        .identity
        .is_guest()
        .then(|| removal_cookie(GUEST_CART_COOKIE, state.config().secure_cookies()));

    Ok((
        StatusCode::CREATED,
        set_cookies(cookies),
        Json(OrderConfirmation {
            order_id: order.id,
            status: order.status,
            total: Price::new(order.total, order.currency.clone()).display(),
            payment_method: order.payment_method_title,
        }),
    ))
}
