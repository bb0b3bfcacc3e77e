//! In-process stand-in for the WooCommerce REST API and the WordPress auth
//! plugins, served over real HTTP so the storefront's clients run unchanged.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use marketstall_core::{CouponLineId, CurrencyCode, LineItemId, OrderId, line_total};
use marketstall_storefront::woo::{
    Address, CouponLine, LineItemPatch, NewOrder, Order, OrderLineItem, OrderPatch,
};

/// A product the fake catalogue serves.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
}

impl FakeProduct {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "slug": self.slug,
            "type": "simple",
            "description": format!("<p>{} description.</p>", self.name),
            "short_description": format!("<p>{}.</p>", self.name),
            "price": self.price.to_string(),
            "regular_price": self.price.to_string(),
            "sale_price": "",
            "on_sale": false,
            "stock_status": "instock",
            "average_rating": "0.00",
            "rating_count": 0,
            "categories": [{"id": 9, "name": "Tea", "slug": "tea"}],
            "images": [],
        })
    }
}

/// A WordPress account the fake auth site accepts.
#[derive(Debug, Clone)]
struct Account {
    id: i64,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Default)]
struct BackendState {
    products: Vec<FakeProduct>,
    orders: BTreeMap<i64, Order>,
    accounts: Vec<Account>,
    reviews: Vec<Value>,
    coupons: HashSet<String>,
    next_id: i64,
    /// Reset codes issued per email.
    reset_codes: HashMap<String, String>,
}

impl BackendState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn price_of(&self, product_id: i64) -> Decimal {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map_or(Decimal::ONE, |p| p.price)
    }

    fn new_line(&mut self, patch: &LineItemPatch) -> OrderLineItem {
        let product_id = patch.product_id.map_or(0, |p| p.get());
        let price = self.price_of(product_id);
        let quantity = patch.quantity.unwrap_or(1);
        let amount = line_total(price, u32::try_from(quantity).unwrap_or(1));
        let name = self
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map_or_else(|| format!("Product {product_id}"), |p| p.name.clone());
        OrderLineItem {
            id: LineItemId::new(self.next_id()),
            name,
            product_id: product_id.into(),
            variation_id: patch.variation_id.map_or(0, |v| v.get()),
            quantity,
            subtotal: amount,
            total: amount,
            price: Some(price),
            sku: String::new(),
            image: None,
        }
    }

    fn customer_json(account: &Account) -> Value {
        json!({
            "id": account.id,
            "email": account.email,
            "first_name": account.first_name,
            "last_name": account.last_name,
            "username": account.email,
            "billing": {
                "first_name": account.first_name,
                "last_name": account.last_name,
                "address_1": "1 Test Street",
                "city": "Springfield",
                "postcode": "12345",
                "country": "US",
                "email": account.email,
            },
            "shipping": {},
        })
    }
}

fn recompute_totals(order: &mut Order) {
    let lines: Decimal = order.line_items.iter().map(|l| l.total).sum();
    order.total = lines - order.discount_total;
}

/// Handle to a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    addr: SocketAddr,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().expect("fake backend state poisoned")
}

impl FakeBackend {
    /// Start the fake backend on an ephemeral port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::default()));
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend server");
        });
        Self { state, addr }
    }

    /// Site URL the storefront should point at.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Add a product to the catalogue.
    pub fn add_product(&self, id: i64, name: &str, price: &str) {
        let price = Decimal::from_str(price).expect("valid price");
        let slug = name.to_lowercase().replace(' ', "-");
        lock(&self.state).products.push(FakeProduct {
            id,
            name: name.to_string(),
            slug,
            price,
        });
    }

    /// Register an account the auth site will accept.
    pub fn add_account(&self, id: i64, email: &str, password: &str, first_name: &str) {
        lock(&self.state).accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
        });
    }

    /// Make a coupon code valid.
    pub fn add_coupon(&self, code: &str) {
        lock(&self.state).coupons.insert(code.to_string());
    }

    /// Snapshot of an order.
    #[must_use]
    pub fn order(&self, id: i64) -> Option<Order> {
        lock(&self.state).orders.get(&id).cloned()
    }

    /// All orders, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        lock(&self.state).orders.values().cloned().collect()
    }

    /// The reset code last issued for `email`.
    #[must_use]
    pub fn reset_code(&self, email: &str) -> Option<String> {
        lock(&self.state).reset_codes.get(email).cloned()
    }
}

/// Build an unsigned JWT for `user_id` valid for an hour.
#[must_use]
pub fn fake_jwt(user_id: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + 3600;
    let claims = json!({
        "iss": "fake-auth-site",
        "exp": exp,
        "data": {"user": {"id": user_id.to_string()}},
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"code": code, "message": message, "data": {"status": status.as_u16()}})),
    )
        .into_response()
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/wp-json/wc/v3/products", get(list_products))
        .route("/wp-json/wc/v3/products/categories", get(list_categories))
        .route(
            "/wp-json/wc/v3/products/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/wp-json/wc/v3/products/{id}", get(get_product))
        .route("/wp-json/wc/v3/orders", get(list_orders).post(create_order))
        .route("/wp-json/wc/v3/orders/{id}", get(get_order).put(update_order))
        .route("/wp-json/wc/v3/customers", post(create_customer))
        .route("/wp-json/wc/v3/customers/{id}", get(get_customer))
        .route("/wp-json/jwt-auth/v1/token", post(issue_token))
        .route("/wp-json/jwt-auth/v1/token/refresh", post(refresh_token))
        .route("/wp-json/bdpwr/v1/reset-password", post(request_reset))
        .route("/wp-json/bdpwr/v1/set-password", post(set_password))
        .with_state(state)
}

// =============================================================================
// Catalogue
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let state = lock(&state);
    let include: Option<Vec<i64>> = query
        .get("include")
        .map(|ids| ids.split(',').filter_map(|id| id.parse().ok()).collect());
    let search = query.get("search").map(|s| s.to_lowercase());

    let products: Vec<Value> = state
        .products
        .iter()
        .filter(|p| query.get("slug").is_none_or(|slug| &p.slug == slug))
        .filter(|p| include.as_ref().is_none_or(|ids| ids.contains(&p.id)))
        .filter(|p| {
            search
                .as_ref()
                .is_none_or(|s| p.name.to_lowercase().contains(s))
        })
        .map(FakeProduct::to_json)
        .collect();

    let total = products.len().to_string();
    (
        [
            ("X-WP-Total", total),
            ("X-WP-TotalPages", "1".to_string()),
        ],
        Json(products),
    )
        .into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = lock(&state);
    state.products.iter().find(|p| p.id == id).map_or_else(
        || error(StatusCode::NOT_FOUND, "woocommerce_rest_product_invalid_id", "Invalid ID."),
        |p| Json(p.to_json()).into_response(),
    )
}

async fn list_categories() -> Json<Value> {
    Json(json!([
        {"id": 9, "name": "Tea", "slug": "tea", "parent": 0, "count": 2}
    ]))
}

async fn list_reviews(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let product: Option<i64> = query.get("product").and_then(|p| p.parse().ok());
    let state = lock(&state);
    Json(
        state
            .reviews
            .iter()
            .filter(|r| product.is_none_or(|id| r["product_id"] == json!(id)))
            .cloned()
            .collect(),
    )
}

async fn create_review(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    let id = state.next_id();
    let mut review = body;
    review["id"] = json!(id);
    review["status"] = json!("approved");
    review["verified"] = json!(false);
    state.reviews.push(review.clone());
    (StatusCode::CREATED, Json(review)).into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Order>> {
    let customer: Option<i64> = query.get("customer").and_then(|c| c.parse().ok());
    let status = query.get("status");
    let state = lock(&state);
    Json(
        state
            .orders
            .values()
            .rev()
            .filter(|o| customer.is_none_or(|c| o.customer_id == c))
            .filter(|o| status.is_none_or(|s| s == o.status.as_str()))
            .cloned()
            .collect(),
    )
}

async fn get_order(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = lock(&state);
    state.orders.get(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, "woocommerce_rest_shop_order_invalid_id", "Invalid ID."),
        |order| Json(order).into_response(),
    )
}

async fn create_order(State(state): State<Shared>, Json(new_order): Json<NewOrder>) -> Response {
    let mut state = lock(&state);
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
        date_created: Some(chrono::Utc::now().naive_utc()),
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
    state.orders.insert(order.id.get(), order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn update_order(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(patch): Json<OrderPatch>,
) -> Response {
    let mut state = lock(&state);
    let Some(mut order) = state.orders.get(&id).cloned() else {
        return error(StatusCode::NOT_FOUND, "woocommerce_rest_shop_order_invalid_id", "Invalid ID.");
    };

    if let Some(coupons) = &patch.coupon_lines {
        let mut lines = Vec::new();
        for coupon in coupons {
            if !state.coupons.contains(&coupon.code) {
                return error(
                    StatusCode::BAD_REQUEST,
                    "woocommerce_rest_invalid_coupon",
                    &format!("Coupon \"{}\" does not exist!", coupon.code),
                );
            }
            let line_id = coupon
                .id
                .unwrap_or_else(|| CouponLineId::new(state.next_id()));
            lines.push(CouponLine {
                id: line_id,
                code: coupon.code.clone(),
                discount: Decimal::ONE,
            });
        }
        order.discount_total = lines.iter().map(|c| c.discount).sum();
        order.coupon_lines = lines;
    }

    if let Some(line_patches) = &patch.line_items {
        for line_patch in line_patches {
            let Some(line_id) = line_patch.id else {
                let line = state.new_line(line_patch);
                order.line_items.push(line);
                continue;
            };
            let Some(pos) = order.line_items.iter().position(|l| l.id == line_id) else {
                continue;
            };
            match line_patch.quantity {
                Some(0) => {
                    order.line_items.remove(pos);
                }
                Some(quantity) => {
                    if let Some(line) = order.line_items.get_mut(pos) {
                        line.quantity = quantity;
                        if let Some(subtotal) = line_patch.subtotal {
                            line.subtotal = subtotal;
                        }
                        if let Some(total) = line_patch.total {
                            line.total = total;
                        }
                    }
                }
                None => {}
            }
        }
    }

    if let Some(status) = patch.status {
        order.status = status;
    }
    if let Some(billing) = patch.billing {
        order.billing = billing;
    }
    if let Some(shipping) = patch.shipping {
        order.shipping = shipping;
    }
    if let Some(method) = patch.payment_method {
        order.payment_method = method;
    }
    if let Some(title) = patch.payment_method_title {
        order.payment_method_title = title;
    }
    if let Some(note) = patch.customer_note {
        order.customer_note = note;
    }
    recompute_totals(&mut order);
    state.orders.insert(id, order.clone());
    Json(order).into_response()
}

// =============================================================================
// Customers and auth
// =============================================================================

#[derive(Deserialize)]
struct NewCustomerBody {
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    password: String,
}

async fn create_customer(
    State(state): State<Shared>,
    Json(body): Json<NewCustomerBody>,
) -> Response {
    let mut state = lock(&state);
    if state
        .accounts
        .iter()
        .any(|a| a.email.eq_ignore_ascii_case(&body.email))
    {
        return error(
            StatusCode::BAD_REQUEST,
            "registration-error-email-exists",
            "An account is already registered with your email address.",
        );
    }
    let account = Account {
        id: state.next_id(),
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
    };
    let customer = BackendState::customer_json(&account);
    state.accounts.push(account);
    (StatusCode::CREATED, Json(customer)).into_response()
}

async fn get_customer(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = lock(&state);
    state.accounts.iter().find(|a| a.id == id).map_or_else(
        || error(StatusCode::NOT_FOUND, "woocommerce_rest_invalid_id", "Invalid resource ID."),
        |account| Json(BackendState::customer_json(account)).into_response(),
    )
}

#[derive(Deserialize)]
struct TokenRequest {
    username: String,
    password: String,
}

async fn issue_token(State(state): State<Shared>, Json(body): Json<TokenRequest>) -> Response {
    let state = lock(&state);
    let Some(account) = state
        .accounts
        .iter()
        .find(|a| a.email.eq_ignore_ascii_case(&body.username) && a.password == body.password)
    else {
        return error(
            StatusCode::FORBIDDEN,
            "[jwt_auth] incorrect_password",
            "The password you entered is incorrect.",
        );
    };
    Json(json!({
        "token": fake_jwt(account.id),
        "user_email": account.email,
        "user_nicename": account.first_name.to_lowercase(),
        "user_display_name": account.first_name,
    }))
    .into_response()
}

async fn refresh_token(headers: HeaderMap) -> Response {
    let user_id = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| token.split('.').nth(1))
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload).ok())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .and_then(|claims| claims["data"]["user"]["id"].as_str()?.parse::<i64>().ok());
    match user_id {
        Some(id) => Json(json!({"token": fake_jwt(id)})).into_response(),
        None => error(StatusCode::FORBIDDEN, "jwt_auth_invalid_token", "Invalid token."),
    }
}

#[derive(Deserialize)]
struct ResetRequestBody {
    email: String,
}

async fn request_reset(
    State(state): State<Shared>,
    Json(body): Json<ResetRequestBody>,
) -> Response {
    let mut state = lock(&state);
    if !state.accounts.iter().any(|a| a.email == body.email) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "bad_email", "No user found.");
    }
    state.reset_codes.insert(body.email, "424242".to_string());
    Json(json!({"data": {"status": 200}, "message": "A password reset email has been sent."}))
        .into_response()
}

#[derive(Deserialize)]
struct SetPasswordBody {
    email: String,
    code: String,
    password: String,
}

async fn set_password(State(state): State<Shared>, Json(body): Json<SetPasswordBody>) -> Response {
    let mut state = lock(&state);
    if state.reset_codes.get(&body.email) != Some(&body.code) {
        return error(StatusCode::BAD_REQUEST, "bad_request", "The reset code provided is not valid.");
    }
    state.reset_codes.remove(&body.email);
    if let Some(account) = state.accounts.iter_mut().find(|a| a.email == body.email) {
        account.password = body.password;
    }
    Json(json!({"data": {"status": 200}, "message": "Password reset successfully."}))
        .into_response()
}
