// Subscription lifecycle and listing quota, driven through the HTTP API

mod common;

use axum::http::StatusCode;
use common::{listing_body, setup_test_app, unique_email, TEST_PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_registration_starts_on_freemium() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;

    let response = app.get("/v1/auth/me").bearer(&token).send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await;
    assert_eq!(me["subscription"]["plan_name"], "Freemium");
    assert_eq!(me["subscription"]["listings_limit"], 3);
    assert_eq!(me["subscription"]["ends_at"], Value::Null);

    let response = app
        .get("/v1/listings/eligibility")
        .bearer(&token)
        .send()
        .await;
    let eligibility: Value = response.json().await;
    assert_eq!(eligibility["can_create_listing"], true);
    assert_eq!(eligibility["remaining_listings"], 3);
    assert_eq!(eligibility["categories"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_duplicate_email_and_login() {
    let app = setup_test_app();
    let email = unique_email();
    app.register(&email).await;

    let response = app
        .post("/v1/auth/register")
        .json(&json!({
            "name": "Second Driver",
            "email": email.to_uppercase(),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "country": "Bulgaria",
            "city": "Plovdiv"
        }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await;
    assert_eq!(body["error"], "The email has already been taken.");

    let response = app
        .post("/v1/auth/login")
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["subscription"]["plan_name"], "Freemium");

    let response = app
        .post("/v1/auth/login")
        .json(&json!({ "email": email, "password": "WrongPass999" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_mismatched_confirmation() {
    let app = setup_test_app();

    let response = app
        .post("/v1/auth/register")
        .json(&json!({
            "name": "Driver",
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "password_confirmation": "SomethingElse1",
            "country": "Bulgaria",
            "city": "Sofia"
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("password_confirmation"));
}

#[tokio::test]
async fn test_quota_blocks_fourth_listing_until_upgrade() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;

    for i in 0..3 {
        app.create_listing(&token, &listing_body(&format!("Kart {}", i), "go-karts", "active"))
            .await;
    }

    let response = app
        .post("/v1/listings")
        .bearer(&token)
        .json(&listing_body("Kart 3", "go-karts", "active"))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json().await;
    assert_eq!(body["limit"], 3);
    assert_eq!(body["active"], 3);
    assert_eq!(body["upgrade_url"], "/v1/subscriptions");

    let response = app.upgrade(&token, "basic").await;
    assert_eq!(response.status(), StatusCode::OK);
    let basic: Value = response.json().await;
    assert_eq!(basic["plan_name"], "Basic");
    assert_eq!(basic["listings_limit"], 50);
    assert!(basic["ends_at"].is_string());

    app.create_listing(&token, &listing_body("Kart 3", "go-karts", "active"))
        .await;

    let eligibility: Value = app
        .get("/v1/listings/eligibility")
        .bearer(&token)
        .send()
        .await
        .json()
        .await;
    assert_eq!(eligibility["remaining_listings"], 46);
    assert_eq!(eligibility["active_listings_count"], 4);
}

#[tokio::test]
async fn test_drafts_do_not_count_but_activation_is_gated() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;

    for i in 0..3 {
        app.create_listing(&token, &listing_body(&format!("Engine {}", i), "engines", "active"))
            .await;
    }
    let draft_id = app
        .create_listing(&token, &listing_body("Spare engine", "engines", "draft"))
        .await;

    let response = app
        .patch(&format!("/v1/listings/{}", draft_id))
        .bearer(&token)
        .json(&json!({ "status": "active" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    // Editing the draft without activating it is fine
    let response = app
        .patch(&format!("/v1/listings/{}", draft_id))
        .bearer(&token)
        .json(&json!({ "title": "Spare engine, low hours" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await;
    assert_eq!(updated["status"], "draft");
    assert_eq!(updated["title"], "Spare engine, low hours");
}

#[tokio::test]
async fn test_premium_cannot_downgrade() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;

    assert_eq!(app.upgrade(&token, "premium").await.status(), StatusCode::OK);

    let response = app.upgrade(&token, "basic").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await;
    assert_eq!(
        body["error"],
        "You cannot downgrade from Premium to Basic. Please contact support."
    );

    let response = app.upgrade(&token, "premium").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.upgrade(&token, "platinum").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let me: Value = app.get("/v1/auth/me").bearer(&token).send().await.json().await;
    assert_eq!(me["subscription"]["plan_name"], "Premium");
    assert_eq!(me["subscription"]["listings_limit"], 999_999);
}

#[tokio::test]
async fn test_cancel_returns_to_freemium_with_history() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;
    app.upgrade(&token, "basic").await;

    let response = app
        .post("/v1/subscriptions/cancel")
        .bearer(&token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let freemium: Value = response.json().await;
    assert_eq!(freemium["plan_name"], "Freemium");

    let overview: Value = app
        .get("/v1/subscriptions")
        .bearer(&token)
        .send()
        .await
        .json()
        .await;
    assert_eq!(overview["current_subscription"]["id"], freemium["id"]);
    assert_eq!(overview["plans"].as_array().unwrap().len(), 3);
    assert_eq!(overview["remaining_listings"], 3);

    let history = overview["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    let ended = history
        .iter()
        .filter(|s| s["id"] != freemium["id"])
        .all(|s| s["ends_at"].is_string());
    assert!(ended, "superseded subscriptions keep an end date");

    let response = app
        .post("/v1/subscriptions/cancel")
        .bearer(&token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_plan_details_only_for_purchasable_plans() {
    let app = setup_test_app();
    let (token, _) = app.register(&unique_email()).await;

    let response = app
        .get("/v1/subscriptions/plans/premium")
        .bearer(&token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let preview: Value = response.json().await;
    assert_eq!(preview["plan"]["slug"], "premium");
    assert_eq!(preview["current_subscription"]["plan_name"], "Freemium");

    let response = app
        .get("/v1/subscriptions/plans/freemium")
        .bearer(&token)
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_routes_require_token() {
    let app = setup_test_app();

    let response = app.get("/v1/subscriptions").send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post("/v1/subscriptions/upgrade")
        .bearer("not-a-token")
        .json(&json!({ "plan": "basic" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
