//! Login, registration, password reset and the customer's own cart.

#![allow(clippy::indexing_slicing)]

use marketstall_integration_tests::{TestContext, find_cookie, new_client, removes_cookie};
use reqwest::StatusCode;
use serde_json::{Value, json};

const EMAIL: &str = "grace@example.com";
const PASSWORD: &str = "correct horse battery";

async fn context() -> TestContext {
    let ctx = TestContext::start().await;
    ctx.backend.add_product(42, "Sencha", "12.50");
    ctx.backend.add_account(5, EMAIL, PASSWORD, "Grace");
    ctx
}

#[tokio::test]
async fn test_me_requires_sign_in() {
    let ctx = context().await;

    let resp = ctx.get("/api/auth/me").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"].is_string());

    // Pages redirect to the login form instead
    let resp = ctx.get("/account").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/auth/login")
    );
}

#[tokio::test]
async fn test_login_me_logout() {
    let ctx = context().await;

    let resp = ctx.login(EMAIL, PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = find_cookie(&resp, "ms_token").expect("token cookie");
    assert!(token.contains("HttpOnly"));
    assert!(removes_cookie(&resp, "ms_guest_cart"));
    let customer: Value = resp.json().await.expect("customer json");
    assert_eq!(customer["id"], 5);
    assert_eq!(customer["email"], EMAIL);
    assert_eq!(customer["display_name"], "Grace");

    let resp = ctx.get("/api/auth/me").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.expect("me json");
    assert_eq!(me["id"], 5);

    let resp = ctx.get("/account").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.expect("account html");
    assert!(html.contains("Grace"));
    assert!(html.contains("Springfield"));

    let resp = ctx.post_json("/api/auth/logout", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(removes_cookie(&resp, "ms_token"));

    let resp = ctx.get("/api/auth/me").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let ctx = context().await;

    let resp = ctx.login(EMAIL, "not the password").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(find_cookie(&resp, "ms_token").is_none());

    let resp = ctx.login("", "").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["fields"]["email"].is_string());
}

#[tokio::test]
async fn test_token_without_session_is_signed_out() {
    let ctx = context().await;

    // A token cookie alone, with no session behind it, is not a sign-in
    let resp = new_client()
        .get(ctx.url("/api/auth/me"))
        .header(
            reqwest::header::COOKIE,
            format!("ms_token={}", marketstall_integration_tests::fake_jwt(5)),
        )
        .send()
        .await
        .expect("me request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let ctx = context().await;
    let form = json!({
        "email": "ada@example.com",
        "password": "analytical engine",
        "password_confirm": "analytical engine",
        "first_name": "Ada",
        "last_name": "Lovelace"
    });

    let resp = ctx.post_json("/api/auth/register", &form).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(find_cookie(&resp, "ms_token").is_some());
    let customer: Value = resp.json().await.expect("customer json");
    assert_eq!(customer["email"], "ada@example.com");

    let resp = new_client()
        .post(ctx.url("/api/auth/register"))
        .json(&form)
        .send()
        .await
        .expect("second register");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let ctx = context().await;
    let resp = ctx
        .post_json(
            "/api/auth/register",
            &json!({"email": "bob@example.com", "password": "short"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_password_reset_round() {
    let ctx = context().await;

    // Unknown addresses get the same answer as known ones
    let unknown = ctx
        .post_json("/api/auth/forgot-password", &json!({"email": "nobody@example.com"}))
        .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    let unknown: Value = unknown.json().await.expect("message json");

    let known = ctx
        .post_json("/api/auth/forgot-password", &json!({"email": EMAIL}))
        .await;
    assert_eq!(known.status(), StatusCode::OK);
    let known: Value = known.json().await.expect("message json");
    assert_eq!(unknown, known);

    let code = ctx.backend.reset_code(EMAIL).expect("reset code issued");

    let resp = ctx
        .post_json(
            "/api/auth/reset-password",
            &json!({"email": EMAIL, "code": "000000", "password": "a brand new secret"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .post_json(
            "/api/auth/reset-password",
            &json!({"email": EMAIL, "code": code, "password": "a brand new secret"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Five credential calls in total, the auth limiter's burst
    assert_eq!(
        ctx.login(EMAIL, "a brand new secret").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_customer_cart_is_owned_and_guest_cart_abandoned() {
    let ctx = context().await;

    // Guest cart first
    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42}))
        .await;
    let guest: Value = resp.json().await.expect("cart json");
    let guest_order = guest["order_id"].as_i64().expect("guest order");

    // After login the customer's cart starts empty; the guest cart stays behind
    ctx.login(EMAIL, PASSWORD).await;
    let cart: Value = ctx.get("/api/cart").await.json().await.expect("cart json");
    assert_eq!(cart["lines"], json!([]));

    let resp = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 2}))
        .await;
    assert!(find_cookie(&resp, "ms_guest_cart").is_none());
    let cart: Value = resp.json().await.expect("cart json");
    let order_id = cart["order_id"].as_i64().expect("customer order");
    assert_ne!(order_id, guest_order);
    assert_eq!(ctx.backend.order(order_id).expect("order").customer_id, 5);

    // Signed-in checkout falls back to the account email
    let resp = ctx
        .post_json(
            "/api/checkout",
            &json!({"billing": {
                "first_name": "Grace",
                "last_name": "Hopper",
                "address_1": "1 Navy Way",
                "city": "Arlington",
                "postcode": "22202",
                "country": "US"
            }}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = ctx.backend.order(order_id).expect("order");
    assert_eq!(order.billing.email.as_deref(), Some(EMAIL));

    let guest = ctx.backend.order(guest_order).expect("guest order");
    assert_eq!(guest.status.as_str(), "shopping-cart");
}

#[tokio::test]
async fn test_guest_cookie_cannot_reach_customer_cart() {
    let ctx = context().await;
    ctx.login(EMAIL, PASSWORD).await;
    let cart: Value = ctx
        .post_json("/api/cart/items", &json!({"product_id": 42, "quantity": 2}))
        .await
        .json()
        .await
        .expect("cart json");
    let order_id = cart["order_id"].as_i64().expect("customer order");

    let resp = new_client()
        .get(ctx.url("/api/cart"))
        .header(reqwest::header::COOKIE, format!("ms_guest_cart={order_id}"))
        .send()
        .await
        .expect("cart request");
    assert_eq!(resp.status(), StatusCode::OK);
    let seen: Value = resp.json().await.expect("cart json");
    assert_eq!(seen["lines"], json!([]));
    assert_eq!(seen["order_id"], Value::Null);

    let resp = new_client()
        .post(ctx.url("/api/cart/items"))
        .header(reqwest::header::COOKIE, format!("ms_guest_cart={order_id}"))
        .json(&json!({"product_id": 42}))
        .send()
        .await
        .expect("add request");
    assert_eq!(resp.status(), StatusCode::OK);
    let issued = find_cookie(&resp, "ms_guest_cart").expect("new guest cookie");
    assert!(!issued.starts_with(&format!("ms_guest_cart={order_id};")));

    let order = ctx.backend.order(order_id).expect("order");
    assert_eq!(order.line_items.len(), 1);
    assert_eq!(order.line_items[0].quantity, 2);
}

#[tokio::test]
async fn test_refresh_needs_token() {
    let ctx = context().await;

    let resp = ctx.post_json("/api/auth/refresh", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    ctx.login(EMAIL, PASSWORD).await;
    let resp = ctx.post_json("/api/auth/refresh", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("refresh json");
    assert_eq!(body["refreshed"], true);
}

#[tokio::test]
async fn test_credential_endpoints_are_rate_limited() {
    let ctx = context().await;

    for _ in 0..5 {
        let resp = ctx.login(EMAIL, "wrong password").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = ctx.login(EMAIL, PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Session endpoints only carry the general API limit
    let resp = ctx.get("/api/auth/me").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
