//! In-memory [`OrderBackend`] that applies patches the way the backend does.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rust_decimal::Decimal;

use marketstall_core::{
    CouponLineId, CurrencyCode, CustomerId, LineItemId, OrderId, ProductId, line_total,
};

use super::OrderBackend;
use crate::woo::{
    Address, CommerceError, CouponLine, LineItemPatch, NewOrder, Order, OrderLineItem, OrderPatch,
};

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    prices: HashMap<ProductId, Decimal>,
    coupons: HashSet<String>,
    next_id: i64,
    writes: usize,
    last_patch: Option<OrderPatch>,
    fail_next: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_failure(&mut self) -> Result<(), CommerceError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(CommerceError::Api {
                status: 500,
                code: "internal_server_error".to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn new_line(&mut self, patch: &LineItemPatch) -> OrderLineItem {
        let product_id = patch.product_id.unwrap();
        let price = self.prices.get(&product_id).copied().unwrap_or(Decimal::ONE);
        let quantity = patch.quantity.unwrap_or(1);
        let amount = line_total(price, u32::try_from(quantity).unwrap());
        OrderLineItem {
            id: LineItemId::new(self.next_id()),
            name: format!("Product {product_id}"),
            product_id,
            variation_id: patch.variation_id.map_or(0, |v| v.get()),
            quantity,
            subtotal: amount,
            total: amount,
            price: Some(price),
            sku: String::new(),
            image: None,
        }
    }
}

/// Thread-safe fake order store.
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_price(&self, product: ProductId, price: Decimal) {
        self.state.lock().unwrap().prices.insert(product, price);
    }

    pub fn add_coupon(&self, code: &str) {
        self.state.lock().unwrap().coupons.insert(code.to_string());
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.state.lock().unwrap().orders.get(&id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    /// Number of create and update calls so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn last_patch(&self) -> Option<OrderPatch> {
        self.state.lock().unwrap().last_patch.clone()
    }

    /// Make the next call fail with a server error.
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    /// Remove `price` from every line, as some backend versions do.
    pub fn strip_line_prices(&self, id: OrderId) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(&id) {
            for line in &mut order.line_items {
                line.price = None;
            }
        }
    }
}

fn recompute_totals(order: &mut Order) {
    let lines: Decimal = order.line_items.iter().map(|l| l.total).sum();
    order.total = lines - order.discount_total;
}

impl OrderBackend for MemoryBackend {
    async fn find_customer_cart(
        &self,
        customer: CustomerId,
    ) -> Result<Option<Order>, CommerceError> {
        let mut state = self.state.lock().unwrap();
        state.check_failure()?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.customer() == Some(customer) && o.status.is_cart())
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, CommerceError> {
        let mut state = self.state.lock().unwrap();
        state.check_failure()?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn create_order(&self, new_order: &NewOrder) -> Result<Order, CommerceError> {
        let mut state = self.state.lock().unwrap();
        state.check_failure()?;
        state.writes += 1;

        let line_items = new_order
            .line_items
            .iter()
            .map(|patch| state.new_line(patch))
            .collect();
        let mut order = Order {
            id: OrderId::new(state.next_id()),
            status: new_order.status,
            currency: CurrencyCode::USD,
            customer_id: new_order.customer_id.map_or(0, |c| c.get()),
            date_created: None,
            discount_total: Decimal::ZERO,
            shipping_total: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            total: Decimal::ZERO,
            line_items,
            coupon_lines: Vec::new(),
            billing: Address::default(),
            shipping: Address::default(),
            payment_method: String::new(),
            payment_method_title: String::new(),
            customer_note: String::new(),
        };
        recompute_totals(&mut order);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, CommerceError> {
        let mut state = self.state.lock().unwrap();
        state.check_failure()?;
        state.writes += 1;
        state.last_patch = Some(patch.clone());

        let mut order = state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(format!("order {id}")))?;

        if let Some(coupons) = &patch.coupon_lines {
            let mut lines = Vec::new();
            for coupon in coupons {
                if !state.coupons.contains(&coupon.code) {
                    return Err(CommerceError::Api {
                        status: 400,
                        code: "woocommerce_rest_invalid_coupon".to_string(),
                        message: format!("Coupon \"{}\" does not exist!", coupon.code),
                    });
                }
                let id = coupon
                    .id
                    .unwrap_or_else(|| CouponLineId::new(state.next_id()));
                lines.push(CouponLine {
                    id,
                    code: coupon.code.clone(),
                    discount: Decimal::ZERO,
                });
            }
            order.coupon_lines = lines;
        }

        if let Some(line_patches) = &patch.line_items {
            for line_patch in line_patches {
                match line_patch.id {
                    Some(line_id) => {
                        let Some(pos) = order.line_items.iter().position(|l| l.id == line_id)
                        else {
                            continue;
                        };
                        match line_patch.quantity {
                            Some(0) => {
                                order.line_items.remove(pos);
                            }
                            Some(quantity) => {
                                let line = &mut order.line_items[pos];
                                line.quantity = quantity;
                                if let Some(subtotal) = line_patch.subtotal {
                                    line.subtotal = subtotal;
                                }
                                if let Some(total) = line_patch.total {
                                    line.total = total;
                                }
                            }
                            None => {}
                        }
                    }
                    None => {
                        let line = state.new_line(line_patch);
                        order.line_items.push(line);
                    }
                }
            }
        }

        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(billing) = &patch.billing {
            order.billing = billing.clone();
        }
        if let Some(shipping) = &patch.shipping {
            order.shipping = shipping.clone();
        }
        if let Some(method) = &patch.payment_method {
            order.payment_method = method.clone();
        }
        if let Some(title) = &patch.payment_method_title {
            order.payment_method_title = title.clone();
        }
        if let Some(note) = &patch.customer_note {
            order.customer_note = note.clone();
        }
        recompute_totals(&mut order);
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }
}
