//! Cart adapter over backend orders.
//!
//! A cart is an order in `shopping-cart` status. Authenticated customers are
//! matched to their cart by customer id; guests carry the order id in a
//! cookie. Every mutation is a read of the current order followed by one
//! write that re-sends the full set of line items with a targeted change:
//!
//! - `{id}` alone keeps a line as is
//! - `{id, quantity: 0}` removes a line
//! - `{id, quantity, subtotal, total}` changes a line
//! - `{product_id, quantity}` adds a line
//!
//! Checkout is a status transition on the same order
//! (`shopping-cart -> pending -> processing`). Taxes and discounts are never
//! computed here; the backend's totals are shown after a refetch.

mod backend;
#[cfg(test)]
mod memory;

pub use backend::OrderBackend;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use marketstall_core::{
    CurrencyCode, CustomerId, LineItemId, OrderId, OrderStatus, Price, ProductId, VariationId,
    line_total,
};

use crate::woo::{
    Address, CommerceError, CouponLinePatch, LineItemPatch, NewOrder, Order, OrderLineItem,
    OrderPatch,
};

/// Payment method recorded on confirmed orders.
pub const PAYMENT_METHOD: &str = "cod";
/// Display title for [`PAYMENT_METHOD`].
pub const PAYMENT_METHOD_TITLE: &str = "Cash on delivery";

// =============================================================================
// Errors
// =============================================================================

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Checkout or a coupon was attempted on a cart without lines.
    #[error("Your cart is empty.")]
    EmptyCart,

    /// A quantity below one, or too large to store, was given.
    #[error("Quantity {0} is not valid.")]
    InvalidQuantity(i64),

    /// The coupon code is blank or was rejected by the backend.
    #[error("Coupon code {0:?} is not valid.")]
    InvalidCoupon(String),

    /// No line with this id exists in the cart.
    #[error("Cart line {0} not found.")]
    LineNotFound(LineItemId),

    /// The commerce backend failed.
    #[error("cart backend error: {0}")]
    Backend(#[from] CommerceError),
}

// =============================================================================
// Cart types
// =============================================================================

/// Who owns a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIdentity {
    /// A signed-in customer.
    Customer(CustomerId),
    /// An anonymous visitor, with the order id from their cookie if any.
    Guest(Option<OrderId>),
}

impl CartIdentity {
    /// The customer id for authenticated identities.
    #[must_use]
    pub const fn customer(self) -> Option<CustomerId> {
        match self {
            Self::Customer(id) => Some(id),
            Self::Guest(_) => None,
        }
    }

    /// Whether this identity is a guest.
    #[must_use]
    pub const fn is_guest(self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

/// One line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub image: Option<String>,
}

impl CartLine {
    /// Build a cart line from a backend line item.
    ///
    /// Lines with a non-positive quantity are dropped.
    fn from_line_item(item: &OrderLineItem) -> Option<Self> {
        let quantity = u32::try_from(item.quantity).ok().filter(|q| *q > 0)?;
        let unit_price = item
            .price
            .unwrap_or_else(|| item.subtotal / Decimal::from(quantity));

        Some(Self {
            id: item.id,
            product_id: item.product_id,
            variation_id: item.variation(),
            name: item.name.clone(),
            sku: item.sku.clone(),
            quantity,
            unit_price,
            subtotal: item.subtotal,
            total: item.total,
            image: item
                .image
                .as_ref()
                .map(|i| i.src.clone())
                .filter(|s| !s.is_empty()),
        })
    }

    fn matches(&self, product: ProductId, variation: Option<VariationId>) -> bool {
        self.product_id == product && self.variation_id == variation
    }

    /// Patch setting this line to `quantity` with recomputed amounts.
    fn with_quantity(&self, quantity: u32) -> LineItemPatch {
        let amount = line_total(self.unit_price, quantity);
        LineItemPatch {
            id: Some(self.id),
            quantity: Some(i64::from(quantity)),
            subtotal: Some(amount),
            total: Some(amount),
            ..LineItemPatch::default()
        }
    }
}

/// A visitor's cart as shown on the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    /// Backing order, `None` when no cart exists yet.
    pub order_id: Option<OrderId>,
    pub currency: CurrencyCode,
    pub lines: Vec<CartLine>,
    /// Applied coupon codes.
    pub coupons: Vec<String>,
    /// Sum of line quantities.
    pub item_count: u32,
    /// Sum of line subtotals, before discounts and tax.
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total_tax: Decimal,
    pub total: Decimal,
}

impl Cart {
    /// A cart with no backing order.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a cart from a backend order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        let lines: Vec<CartLine> = order
            .line_items
            .iter()
            .filter_map(CartLine::from_line_item)
            .collect();

        Self {
            order_id: Some(order.id),
            currency: order.currency.clone(),
            item_count: lines.iter().map(|l| l.quantity).sum(),
            subtotal: lines.iter().map(|l| l.subtotal).sum(),
            lines,
            coupons: order.coupon_lines.iter().map(|c| c.code.clone()).collect(),
            discount_total: order.discount_total,
            total_tax: order.total_tax,
            total: order.total,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by id.
    #[must_use]
    pub fn line(&self, id: LineItemId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Format an amount in the cart's currency.
    #[must_use]
    pub fn money(&self, amount: &Decimal) -> String {
        Price::new(*amount, self.currency.clone()).display()
    }
}

/// Result of a cart mutation.
#[derive(Debug, Clone)]
pub struct CartUpdate {
    pub cart: Cart,
    /// Set when a new guest cart was created; the caller stores it in the
    /// guest cookie.
    pub issued_guest_id: Option<OrderId>,
}

impl CartUpdate {
    const fn unchanged(cart: Cart) -> Self {
        Self {
            cart,
            issued_guest_id: None,
        }
    }
}

/// Item to add to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddItem {
    pub product_id: ProductId,
    pub variation_id: Option<VariationId>,
    pub quantity: i64,
}

/// Customer details collected at checkout.
#[derive(Debug, Clone, Default)]
pub struct CheckoutDetails {
    pub billing: Address,
    /// Defaults to the billing address.
    pub shipping: Option<Address>,
    pub customer_note: Option<String>,
}

// =============================================================================
// CartService
// =============================================================================

/// Cart operations against an [`OrderBackend`].
#[derive(Debug, Clone)]
pub struct CartService<B> {
    backend: B,
}

impl<B: OrderBackend> CartService<B> {
    /// Create a cart service over `backend`.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the order backing `identity`'s cart.
    ///
    /// A guest id pointing at a missing order, at an order that has left
    /// cart status, or at a customer's order counts as no cart.
    async fn load(&self, identity: CartIdentity) -> Result<Option<Order>, CartError> {
        let order = match identity {
            CartIdentity::Customer(customer) => self
                .backend
                .find_customer_cart(customer)
                .await
                .map_err(backend_failure("find_customer_cart"))?,
            CartIdentity::Guest(Some(order_id)) => self
                .backend
                .get_order(order_id)
                .await
                .map_err(backend_failure("get_order"))?
                .filter(|o| o.customer().is_none()),
            CartIdentity::Guest(None) => None,
        };
        Ok(order.filter(|o| o.status.is_cart()))
    }

    async fn write(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, CartError> {
        self.backend
            .update_order(id, patch)
            .await
            .map_err(backend_failure("update_order"))
    }

    /// Write `line_items`, keeping every other field as is.
    async fn write_lines(
        &self,
        id: OrderId,
        line_items: Vec<LineItemPatch>,
    ) -> Result<CartUpdate, CartError> {
        let patch = OrderPatch {
            line_items: Some(line_items),
            ..OrderPatch::default()
        };
        let order = self.write(id, &patch).await?;
        Ok(CartUpdate::unchanged(Cart::from_order(&order)))
    }

    /// Re-send every line of `cart`, replacing the one with `target`.
    fn lines_with(cart: &Cart, target: LineItemId, patch: LineItemPatch) -> Vec<LineItemPatch> {
        cart.lines
            .iter()
            .map(|line| {
                if line.id == target {
                    patch.clone()
                } else {
                    LineItemPatch::keep(line.id)
                }
            })
            .collect()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart for `identity`. Never creates anything.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self))]
    pub async fn fetch(&self, identity: CartIdentity) -> Result<Cart, CartError> {
        Ok(self
            .load(identity)
            .await?
            .map_or_else(Cart::empty, |o| Cart::from_order(&o)))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an item, creating the cart on first use.
    ///
    /// Adding a product that is already in the cart increments its line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for quantities below one and
    /// [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self), fields(product_id = %item.product_id, quantity = item.quantity))]
    pub async fn add_item(
        &self,
        identity: CartIdentity,
        item: AddItem,
    ) -> Result<CartUpdate, CartError> {
        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity(item.quantity))?;

        let Some(order) = self.load(identity).await? else {
            let new_order = NewOrder {
                status: OrderStatus::ShoppingCart,
                customer_id: identity.customer(),
                line_items: vec![LineItemPatch {
                    product_id: Some(item.product_id),
                    variation_id: item.variation_id,
                    quantity: Some(i64::from(quantity)),
                    ..LineItemPatch::default()
                }],
                set_paid: false,
            };
            let order = self
                .backend
                .create_order(&new_order)
                .await
                .map_err(backend_failure("create_order"))?;

            tracing::info!(order_id = %order.id, guest = identity.is_guest(), "Created cart");

            return Ok(CartUpdate {
                issued_guest_id: identity.is_guest().then_some(order.id),
                cart: Cart::from_order(&order),
            });
        };

        let cart = Cart::from_order(&order);

        if let Some(line) = cart
            .lines
            .iter()
            .find(|l| l.matches(item.product_id, item.variation_id))
        {
            let patch = line.with_quantity(line.quantity.saturating_add(quantity));
            let lines = Self::lines_with(&cart, line.id, patch);
            return self.write_lines(order.id, lines).await;
        }

        let mut lines: Vec<LineItemPatch> =
            cart.lines.iter().map(|l| LineItemPatch::keep(l.id)).collect();
        lines.push(LineItemPatch {
            product_id: Some(item.product_id),
            variation_id: item.variation_id,
            quantity: Some(i64::from(quantity)),
            ..LineItemPatch::default()
        });
        self.write_lines(order.id, lines).await
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for quantities too large to
    /// store, [`CartError::LineNotFound`] if the cart has no such line and
    /// [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &self,
        identity: CartIdentity,
        line_id: LineItemId,
        quantity: i64,
    ) -> Result<CartUpdate, CartError> {
        if quantity <= 0 {
            return self.remove_item(identity, line_id).await;
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;

        let order = self
            .load(identity)
            .await?
            .ok_or(CartError::LineNotFound(line_id))?;
        let cart = Cart::from_order(&order);
        let line = cart.line(line_id).ok_or(CartError::LineNotFound(line_id))?;

        let lines = Self::lines_with(&cart, line_id, line.with_quantity(quantity));
        self.write_lines(order.id, lines).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the cart has no such line and
    /// [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(
        &self,
        identity: CartIdentity,
        line_id: LineItemId,
    ) -> Result<CartUpdate, CartError> {
        let order = self
            .load(identity)
            .await?
            .ok_or(CartError::LineNotFound(line_id))?;
        let cart = Cart::from_order(&order);
        if cart.line(line_id).is_none() {
            return Err(CartError::LineNotFound(line_id));
        }

        let lines = Self::lines_with(&cart, line_id, LineItemPatch::remove(line_id));
        self.write_lines(order.id, lines).await
    }

    /// Remove every line. Clearing an empty or missing cart writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, identity: CartIdentity) -> Result<CartUpdate, CartError> {
        let Some(order) = self.load(identity).await? else {
            return Ok(CartUpdate::unchanged(Cart::empty()));
        };
        let cart = Cart::from_order(&order);
        if cart.is_empty() {
            return Ok(CartUpdate::unchanged(cart));
        }

        let lines = cart
            .lines
            .iter()
            .map(|l| LineItemPatch::remove(l.id))
            .collect();
        self.write_lines(order.id, lines).await
    }

    /// Apply a coupon code. Codes are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidCoupon`] for a blank or rejected code,
    /// [`CartError::EmptyCart`] when there is nothing to discount and
    /// [`CartError::Backend`] if the backend fails.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        identity: CartIdentity,
        code: &str,
    ) -> Result<CartUpdate, CartError> {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            return Err(CartError::InvalidCoupon(code));
        }

        let order = self.load(identity).await?.ok_or(CartError::EmptyCart)?;
        let cart = Cart::from_order(&order);
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }
        if cart.coupons.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
            return Ok(CartUpdate::unchanged(cart));
        }

        let mut coupon_lines: Vec<CouponLinePatch> = order
            .coupon_lines
            .iter()
            .map(|c| CouponLinePatch {
                id: Some(c.id),
                code: c.code.clone(),
            })
            .collect();
        coupon_lines.push(CouponLinePatch {
            id: None,
            code: code.clone(),
        });

        let patch = OrderPatch {
            coupon_lines: Some(coupon_lines),
            ..OrderPatch::default()
        };
        match self.backend.update_order(order.id, &patch).await {
            Ok(order) => Ok(CartUpdate::unchanged(Cart::from_order(&order))),
            Err(CommerceError::Api { status: 400, .. }) => Err(CartError::InvalidCoupon(code)),
            Err(e) => Err(backend_failure("update_order")(e)),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turn the cart into a pending order.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::EmptyCart`] if there is no cart or it has no
    /// lines; the order's status is not touched in that case.
    #[instrument(skip(self))]
    pub async fn convert_to_order(&self, identity: CartIdentity) -> Result<Order, CartError> {
        let order = self.load(identity).await?.ok_or(CartError::EmptyCart)?;
        if Cart::from_order(&order).is_empty() {
            return Err(CartError::EmptyCart);
        }

        let patch = OrderPatch {
            status: Some(OrderStatus::Pending),
            ..OrderPatch::default()
        };
        let order = self.write(order.id, &patch).await?;
        tracing::info!(order_id = %order.id, "Cart converted to order");
        Ok(order)
    }

    /// Record customer details on a pending order and move it to processing
    /// with cash on delivery.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Backend`] if the backend fails. The order then
    /// stays `pending` and is logged for follow-up.
    #[instrument(skip(self, details), fields(order_id = %order_id))]
    pub async fn confirm_order(
        &self,
        order_id: OrderId,
        details: CheckoutDetails,
    ) -> Result<Order, CartError> {
        let shipping = details
            .shipping
            .unwrap_or_else(|| Address {
                email: None,
                phone: None,
                ..details.billing.clone()
            });
        let patch = OrderPatch {
            status: Some(OrderStatus::Processing),
            billing: Some(details.billing),
            shipping: Some(shipping),
            customer_note: details.customer_note,
            payment_method: Some(PAYMENT_METHOD.to_string()),
            payment_method_title: Some(PAYMENT_METHOD_TITLE.to_string()),
            set_paid: Some(false),
            ..OrderPatch::default()
        };
        let order = self.write(order_id, &patch).await.inspect_err(|_| {
            tracing::error!(
                order_id = %order_id,
                status = OrderStatus::Pending.as_str(),
                "Order left pending: confirmation failed"
            );
        })?;
        tracing::info!(order_id = %order.id, "Order confirmed");
        Ok(order)
    }
}

/// Log a backend failure and wrap it.
fn backend_failure(operation: &'static str) -> impl FnOnce(CommerceError) -> CartError {
    move |error| {
        tracing::error!(error = %error, operation, "Cart backend call failed");
        CartError::Backend(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use super::memory::MemoryBackend;
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn service() -> CartService<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.set_price(ProductId::new(42), dec("12.50"));
        backend.set_price(ProductId::new(7), dec("3.33"));
        backend.add_coupon("save10");
        CartService::new(backend)
    }

    fn add(product: i64, quantity: i64) -> AddItem {
        AddItem {
            product_id: ProductId::new(product),
            variation_id: None,
            quantity,
        }
    }

    async fn guest_cart(service: &CartService<MemoryBackend>) -> CartIdentity {
        let update = service
            .add_item(CartIdentity::Guest(None), add(42, 1))
            .await
            .unwrap();
        CartIdentity::Guest(update.issued_guest_id)
    }

    #[tokio::test]
    async fn test_fetch_without_cookie_is_empty_and_creates_nothing() {
        let service = service();
        let cart = service.fetch(CartIdentity::Guest(None)).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.order_id, None);
        assert_eq!(service.backend().order_count(), 0);
    }

    #[tokio::test]
    async fn test_first_guest_add_creates_cart_and_issues_id() {
        let service = service();
        let update = service
            .add_item(CartIdentity::Guest(None), add(42, 1))
            .await
            .unwrap();

        let order_id = update.issued_guest_id.unwrap();
        assert_eq!(update.cart.order_id, Some(order_id));
        assert_eq!(update.cart.lines.len(), 1);
        assert_eq!(update.cart.lines[0].quantity, 1);

        let order = service.backend().order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::ShoppingCart);
        assert_eq!(order.customer(), None);
    }

    #[tokio::test]
    async fn test_customer_add_creates_owned_cart_without_guest_id() {
        let service = service();
        let customer = CustomerId::new(5);
        let update = service
            .add_item(CartIdentity::Customer(customer), add(42, 2))
            .await
            .unwrap();

        assert_eq!(update.issued_guest_id, None);
        let order = service
            .backend()
            .order(update.cart.order_id.unwrap())
            .unwrap();
        assert_eq!(order.customer(), Some(customer));

        let fetched = service.fetch(CartIdentity::Customer(customer)).await.unwrap();
        assert_eq!(fetched.item_count, 2);
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let service = service();
        for quantity in [0, -3] {
            let err = service
                .add_item(CartIdentity::Guest(None), add(42, quantity))
                .await
                .unwrap_err();
            assert!(matches!(err, CartError::InvalidQuantity(q) if q == quantity));
        }
        assert_eq!(service.backend().order_count(), 0);
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_line() {
        let service = service();
        let identity = guest_cart(&service).await;

        let update = service.add_item(identity, add(42, 2)).await.unwrap();

        assert_eq!(update.issued_guest_id, None);
        assert_eq!(update.cart.lines.len(), 1);
        assert_eq!(update.cart.lines[0].quantity, 3);
        assert_eq!(update.cart.lines[0].subtotal, dec("37.50"));
    }

    #[tokio::test]
    async fn test_add_new_product_keeps_existing_lines() {
        let service = service();
        let identity = guest_cart(&service).await;

        let update = service.add_item(identity, add(7, 1)).await.unwrap();
        assert_eq!(update.cart.lines.len(), 2);
        assert_eq!(update.cart.item_count, 2);

        let patch = service.backend().last_patch().unwrap();
        let lines = patch.line_items.unwrap();
        assert_eq!(lines[0], LineItemPatch::keep(update.cart.lines[0].id));
        assert_eq!(lines[1].product_id, Some(ProductId::new(7)));
        assert_eq!(lines[1].id, None);
    }

    #[tokio::test]
    async fn test_update_quantity_recomputes_subtotal() {
        let service = service();
        let identity = guest_cart(&service).await;
        let cart = service.add_item(identity, add(7, 1)).await.unwrap().cart;
        let line = cart.lines[1].clone();

        let update = service
            .update_quantity(identity, line.id, 3)
            .await
            .unwrap();
        let updated = update.cart.line(line.id).unwrap();

        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.subtotal, line_total(dec("3.33"), 3));
        assert_eq!(updated.subtotal, dec("9.99"));

        let lines = service.backend().last_patch().unwrap().line_items.unwrap();
        assert_eq!(lines[0], LineItemPatch::keep(cart.lines[0].id));
        assert_eq!(lines[1].quantity, Some(3));
        assert_eq!(lines[1].subtotal, Some(dec("9.99")));
        assert_eq!(lines[1].total, Some(dec("9.99")));
    }

    #[tokio::test]
    async fn test_update_quantity_derives_unit_price_from_subtotal() {
        let service = service();
        let identity = guest_cart(&service).await;
        let order_id = service.fetch(identity).await.unwrap().order_id.unwrap();
        service.backend().strip_line_prices(order_id);

        let cart = service.fetch(identity).await.unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.unit_price, dec("12.50"));

        let update = service.update_quantity(identity, line.id, 4).await.unwrap();
        assert_eq!(update.cart.lines[0].subtotal, dec("50.00"));
    }

    #[tokio::test]
    async fn test_update_quantity_zero_or_negative_removes_line() {
        for quantity in [0, -1] {
            let service = service();
            let identity = guest_cart(&service).await;
            let line_id = service.fetch(identity).await.unwrap().lines[0].id;

            let update = service
                .update_quantity(identity, line_id, quantity)
                .await
                .unwrap();
            assert!(update.cart.is_empty());

            let lines = service.backend().last_patch().unwrap().line_items.unwrap();
            assert_eq!(lines, vec![LineItemPatch::remove(line_id)]);
        }
    }

    #[tokio::test]
    async fn test_update_unknown_line() {
        let service = service();
        let identity = guest_cart(&service).await;

        let err = service
            .update_quantity(identity, LineItemId::new(999), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineNotFound(_)));

        let err = service
            .remove_item(CartIdentity::Guest(None), LineItemId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_item_sends_zero_quantity() {
        let service = service();
        let identity = guest_cart(&service).await;
        let cart = service.add_item(identity, add(7, 2)).await.unwrap().cart;
        let target = cart.lines[0].id;

        let update = service.remove_item(identity, target).await.unwrap();
        assert_eq!(update.cart.lines.len(), 1);
        assert_eq!(update.cart.lines[0].product_id, ProductId::new(7));

        let lines = service.backend().last_patch().unwrap().line_items.unwrap();
        assert_eq!(
            lines,
            vec![
                LineItemPatch::remove(target),
                LineItemPatch::keep(cart.lines[1].id)
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_removes_all_lines() {
        let service = service();
        let identity = guest_cart(&service).await;
        service.add_item(identity, add(7, 2)).await.unwrap();

        let update = service.clear(identity).await.unwrap();
        assert!(update.cart.is_empty());
        assert_eq!(update.cart.item_count, 0);
    }

    #[tokio::test]
    async fn test_clear_empty_cart_is_noop() {
        let service = service();

        let update = service.clear(CartIdentity::Guest(None)).await.unwrap();
        assert!(update.cart.is_empty());
        assert_eq!(service.backend().write_count(), 0);

        let identity = guest_cart(&service).await;
        service.clear(identity).await.unwrap();
        let writes = service.backend().write_count();

        let update = service.clear(identity).await.unwrap();
        assert!(update.cart.is_empty());
        assert_eq!(service.backend().write_count(), writes);
    }

    #[tokio::test]
    async fn test_apply_coupon_normalizes_code() {
        let service = service();
        let identity = guest_cart(&service).await;

        let update = service.apply_coupon(identity, "  SAVE10 ").await.unwrap();
        assert_eq!(update.cart.coupons, vec!["save10".to_string()]);

        let writes = service.backend().write_count();
        service.apply_coupon(identity, "Save10").await.unwrap();
        assert_eq!(service.backend().write_count(), writes);
    }

    #[tokio::test]
    async fn test_apply_coupon_errors() {
        let service = service();

        let err = service
            .apply_coupon(CartIdentity::Guest(None), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidCoupon(_)));

        let err = service
            .apply_coupon(CartIdentity::Guest(None), "save10")
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));

        let identity = guest_cart(&service).await;
        let err = service.apply_coupon(identity, "bogus").await.unwrap_err();
        assert!(matches!(err, CartError::InvalidCoupon(code) if code == "bogus"));
    }

    #[tokio::test]
    async fn test_convert_empty_cart_fails_without_status_change() {
        let service = service();
        let identity = guest_cart(&service).await;
        let order_id = service.fetch(identity).await.unwrap().order_id.unwrap();
        service.clear(identity).await.unwrap();
        let writes = service.backend().write_count();

        let err = service.convert_to_order(identity).await.unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));
        assert_eq!(service.backend().write_count(), writes);
        assert_eq!(
            service.backend().order(order_id).unwrap().status,
            OrderStatus::ShoppingCart
        );

        let err = service
            .convert_to_order(CartIdentity::Guest(None))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));
    }

    #[tokio::test]
    async fn test_checkout_transitions_and_retires_guest_cart() {
        let service = service();
        let identity = guest_cart(&service).await;

        let order = service.convert_to_order(identity).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let details = CheckoutDetails {
            billing: Address {
                first_name: "Ada".to_string(),
                email: Some("ada@example.com".to_string()),
                ..Address::default()
            },
            shipping: None,
            customer_note: Some("Leave at the door".to_string()),
        };
        let order = service.confirm_order(order.id, details).await.unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_method, PAYMENT_METHOD);
        assert_eq!(order.payment_method_title, PAYMENT_METHOD_TITLE);
        assert_eq!(order.shipping.first_name, "Ada");
        assert_eq!(order.shipping.email, None);
        assert_eq!(service.backend().last_patch().unwrap().set_paid, Some(false));

        // The old guest id no longer resolves to a cart
        let cart = service.fetch(identity).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.order_id, None);
    }

    #[tokio::test]
    async fn test_failed_confirmation_leaves_order_pending() {
        let service = service();
        let identity = guest_cart(&service).await;
        let pending = service.convert_to_order(identity).await.unwrap();

        service.backend().fail_next();
        let err = service
            .confirm_order(
                pending.id,
                CheckoutDetails {
                    billing: Address::default(),
                    shipping: None,
                    customer_note: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Backend(_)));
        assert_eq!(
            service.backend().order(pending.id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_stale_guest_id_is_no_cart() {
        let service = service();
        let identity = CartIdentity::Guest(Some(OrderId::new(404)));

        assert!(service.fetch(identity).await.unwrap().is_empty());

        let update = service.add_item(identity, add(42, 1)).await.unwrap();
        let issued = update.issued_guest_id.unwrap();
        assert_ne!(issued, OrderId::new(404));
    }

    #[tokio::test]
    async fn test_guest_id_of_customer_cart_is_no_cart() {
        let service = service();
        let customer = CustomerId::new(5);
        let owned = service
            .add_item(CartIdentity::Customer(customer), add(42, 2))
            .await
            .unwrap()
            .cart;
        let order_id = owned.order_id.unwrap();
        let line_id = owned.lines[0].id;
        let forged = CartIdentity::Guest(Some(order_id));

        let cart = service.fetch(forged).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.order_id, None);

        let err = service
            .update_quantity(forged, line_id, 9)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::LineNotFound(_)));
        let err = service.convert_to_order(forged).await.unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));

        let update = service.add_item(forged, add(7, 1)).await.unwrap();
        assert_ne!(update.issued_guest_id, Some(order_id));

        let order = service.backend().order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::ShoppingCart);
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_update_quantity_too_large_is_rejected() {
        let service = service();
        let identity = guest_cart(&service).await;
        let line_id = service.fetch(identity).await.unwrap().lines[0].id;
        let writes = service.backend().write_count();

        let err = service
            .update_quantity(identity, line_id, 5_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(5_000_000_000)));
        assert_eq!(service.backend().write_count(), writes);

        let cart = service.fetch(identity).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_backend_error() {
        let service = service();
        service.backend().fail_next();

        let err = service
            .add_item(CartIdentity::Guest(None), add(42, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Backend(_)));
    }

    #[tokio::test]
    async fn test_guest_scenario_end_to_end() {
        let service = service();

        let cart = service.fetch(CartIdentity::Guest(None)).await.unwrap();
        assert!(cart.is_empty());

        let update = service
            .add_item(CartIdentity::Guest(None), add(42, 1))
            .await
            .unwrap();
        let identity = CartIdentity::Guest(update.issued_guest_id);
        assert_eq!(update.cart.lines.len(), 1);
        let line_id = update.cart.lines[0].id;

        let update = service.update_quantity(identity, line_id, 3).await.unwrap();
        assert_eq!(update.cart.subtotal, dec("37.50"));

        let update = service.remove_item(identity, line_id).await.unwrap();
        assert!(update.cart.is_empty());

        let err = service.convert_to_order(identity).await.unwrap_err();
        assert!(matches!(err, CartError::EmptyCart));
    }

    #[test]
    fn test_cart_from_order_skips_zero_quantity_lines() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 10,
            "status": "shopping-cart",
            "currency": "USD",
            "total": "25.00",
            "line_items": [
                {"id": 1, "product_id": 42, "quantity": 2, "subtotal": "25.00", "total": "25.00", "price": 12.5},
                {"id": 2, "product_id": 7, "quantity": 0, "subtotal": "0.00", "total": "0.00"}
            ]
        }))
        .unwrap();

        let cart = Cart::from_order(&order);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.subtotal, dec("25.00"));
        assert_eq!(cart.money(&cart.total), "$25.00");
    }
}
