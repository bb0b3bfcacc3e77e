//! Guest and customer carts through the JSON API, ending in checkout.

#![allow(clippy::indexing_slicing)]

use marketstall_integration_tests::{TestContext, find_cookie, removes_cookie};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

const GUEST_COOKIE: &str = "ms_guest_cart";

fn billing() -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "address_1": "12 Analytical Row",
        "city": "London",
        "postcode": "N1 9GU",
        "country": "GB",
        "email": "ada@example.com"
    })
}

async fn context() -> TestContext {
    let ctx = TestContext::start().await;
    ctx.backend.add_product(42, "Sencha", "12.50");
    ctx.backend.add_product(7, "Genmaicha", "3.33");
    ctx.backend.add_coupon("save1");
    ctx
}

#[tokio::test]
async fn test_guest_cart_lifecycle() {
    let ctx = context().await;

    // No cookie yet: empty cart and nothing created upstream
    let resp = ctx.get("/api/cart").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(cart["order_id"], Value::Null);
    assert!(ctx.backend.orders().is_empty());

    // First add creates the cart and issues the guest cookie
    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 1}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = find_cookie(&resp, GUEST_COOKIE).expect("guest cookie issued");
    assert!(cookie.contains("HttpOnly"));
    let cart: Value = resp.json().await.expect("cart json");
    let order_id = cart["order_id"].as_i64().expect("order id");
    assert!(cookie.starts_with(&format!("{GUEST_COOKIE}={order_id}")));
    assert_eq!(cart["lines"][0]["quantity"], 1);
    assert_eq!(cart["item_count"], 1);

    let order = ctx.backend.order(order_id).expect("backend order");
    assert_eq!(order.status.as_str(), "shopping-cart");
    assert_eq!(order.customer_id, 0);

    // Adding the same product again increments the existing line
    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42}))
        .await;
    assert!(find_cookie(&resp, GUEST_COOKIE).is_none());
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["lines"][0]["quantity"], 2);
    let line_id = cart["lines"][0]["id"].as_i64().expect("line id");

    // Set quantity to 3; the line total follows the unit price
    let resp = ctx
        .send_json(
            Method::PATCH,
            &format!("/api/cart/items/{line_id}"),
            &json!({"quantity": 3}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["lines"][0]["quantity"], 3);
    assert_eq!(cart["lines"][0]["subtotal"], "37.50");
    assert_eq!(cart["total"], "37.50");

    // Remove the line; the cart order survives with no lines
    let resp = ctx
        .client
        .delete(ctx.url(&format!("/api/cart/items/{line_id}")))
        .send()
        .await
        .expect("delete line");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(ctx.backend.orders().len(), 1);

    // Checkout with nothing in the cart is refused and the order is untouched
    let resp = ctx
        .post_json("/api/checkout", &json!({"billing": billing()}))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let order = ctx.backend.order(order_id).expect("backend order");
    assert_eq!(order.status.as_str(), "shopping-cart");
}

#[tokio::test]
async fn test_guest_checkout_places_order_and_clears_cookie() {
    let ctx = context().await;

    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 2}))
        .await;
    let cart: Value = resp.json().await.expect("cart json");
    let order_id = cart["order_id"].as_i64().expect("order id");

    let resp = ctx
        .post_json(
            "/api/checkout",
            &json!({"billing": billing(), "customer_note": "  Leave at the door  "}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(removes_cookie(&resp, GUEST_COOKIE));
    let confirmation: Value = resp.json().await.expect("confirmation json");
    assert_eq!(confirmation["order_id"], order_id);
    assert_eq!(confirmation["status"], "processing");
    assert_eq!(confirmation["total"], "$25.00");
    assert_eq!(confirmation["payment_method"], "Cash on delivery");

    let order = ctx.backend.order(order_id).expect("backend order");
    assert_eq!(order.status.as_str(), "processing");
    assert_eq!(order.payment_method, "cod");
    assert_eq!(order.billing.city, "London");
    assert_eq!(order.shipping.address_1, "12 Analytical Row");
    assert_eq!(order.customer_note, "Leave at the door");

    // The placed order is no longer a cart
    let cart: Value = ctx.get("/api/cart").await.json().await.expect("cart json");
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
async fn test_checkout_reports_missing_billing_fields() {
    let ctx = context().await;
    ctx.post_json("/api/cart/items", &json!({"product_id": 7}))
        .await;

    let resp = ctx
        .post_json(
            "/api/checkout",
            &json!({"billing": {"first_name": "Ada", "email": "not-an-email"}}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("error json");
    assert_eq!(body["fields"]["billing.city"], "This field is required.");
    assert_eq!(
        body["fields"]["billing.email"],
        "Please enter a valid email address."
    );
    assert!(body["fields"].get("billing.first_name").is_none());

    let orders = ctx.backend.orders();
    assert_eq!(orders[0].status.as_str(), "shopping-cart");
}

#[tokio::test]
async fn test_invalid_quantity_and_unknown_line() {
    let ctx = context().await;

    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 0}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.backend.orders().is_empty());

    let resp = ctx
        .send_json(Method::PATCH, "/api/cart/items/999", &json!({"quantity": 2}))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_coupons_and_clear() {
    let ctx = context().await;

    // Coupons need something to discount
    let resp = ctx
        .post_json("/api/cart/coupons", &json!({"code": "save1"}))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    ctx.post_json("/api/cart/items", &json!({"product_id": 42}))
        .await;
    ctx.post_json("/api/cart/items", &json!({"product_id": 7}))
        .await;

    let resp = ctx
        .post_json("/api/cart/coupons", &json!({"code": "bogus"}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .post_json("/api/cart/coupons", &json!({"code": " SAVE1 "}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["coupons"], json!(["save1"]));
    assert_eq!(cart["discount_total"], "1");

    let resp = ctx
        .client
        .delete(ctx.url("/api/cart"))
        .send()
        .await
        .expect("clear cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart: Value = resp.json().await.expect("cart json");
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
async fn test_cart_page_renders_lines() {
    let ctx = context().await;
    ctx.post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 2}))
        .await;

    let resp = ctx.get("/cart").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.expect("cart html");
    assert!(html.contains("Sencha"));
    assert!(html.contains("$25.00"));
    assert!(html.contains("Cash on delivery"));
}
