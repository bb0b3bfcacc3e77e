//! Cart JSON API.
//!
//! Every response carries the full cart. The first mutation that creates a
//! guest cart also sets the guest cookie; plain reads never do.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use marketstall_core::{LineItemId, ProductId, VariationId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::CartOwner;
use crate::middleware::cookies::{SetCookies, guest_cart_cookie, set_cookies};
use crate::services::cart::{AddItem, Cart, CartUpdate};
use crate::state::AppState;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variation_id: Option<VariationId>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Body of `PATCH /api/cart/items/{line_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Body of `POST /api/cart/coupons`.
#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
}

/// Cart plus any cookie the mutation issued.
fn respond(state: &AppState, update: CartUpdate) -> (SetCookies, Json<Cart>) {
    let cookies = update
        .issued_guest_id
        .map(|id| guest_cart_cookie(id, state.config().secure_cookies()));
    (set_cookies(cookies), Json(update.cart))
}

/// Current cart.
#[instrument(skip(state, owner))]
pub async fn show(State(state): State<AppState>, owner: CartOwner) -> Result<Json<Cart>> {
    Ok(Json(state.cart().fetch(owner.identity).await?))
}

/// Add an item, creating the cart if needed.
#[instrument(skip(state, owner), fields(product_id = %request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(request): Json<AddItemRequest>,
) -> Result<(SetCookies, Json<Cart>)> {
    let item = AddItem {
        product_id: request.product_id,
        variation_id: request.variation_id,
        quantity: request.quantity,
    };
    let update = state.cart().add_item(owner.identity, item).await?;

    let product_id = request.product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", &product_id)]));
    Ok(respond(&state, update))
}

/// Change a line's quantity; zero or less removes it.
#[instrument(skip(state, owner))]
pub async fn update_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(line_id): Path<i64>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<(SetCookies, Json<Cart>)> {
    let update = state
        .cart()
        .update_quantity(owner.identity, LineItemId::new(line_id), request.quantity)
        .await?;
    Ok(respond(&state, update))
}

/// Remove a line.
#[instrument(skip(state, owner))]
pub async fn remove_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(line_id): Path<i64>,
) -> Result<(SetCookies, Json<Cart>)> {
    let update = state
        .cart()
        .remove_item(owner.identity, LineItemId::new(line_id))
        .await?;
    Ok(respond(&state, update))
}

/// Remove every line.
#[instrument(skip(state, owner))]
pub async fn clear(
    State(state): State<AppState>,
    owner: CartOwner,
) -> Result<(SetCookies, Json<Cart>)> {
    let update = state.cart().clear(owner.identity).await?;
    Ok(respond(&state, update))
}

/// Apply a coupon code.
#[instrument(skip(state, owner, request))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(request): Json<CouponRequest>,
) -> Result<(SetCookies, Json<Cart>)> {
    let update = state
        .cart()
        .apply_coupon(owner.identity, &request.code)
        .await?;
    add_breadcrumb("cart", "Applied coupon", None);
    Ok(respond(&state, update))
}
