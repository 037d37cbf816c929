// Common test utilities shared by the integration tests
// The router runs against the in-memory store and a throwaway media directory.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use classifieds_backend::{
    app::AppState,
    app_config::AppConfig,
    build_router,
    db::{MarketplaceStore, MemoryStore},
    models::DEFAULT_CATEGORIES,
    services::{LocalMediaStore, MediaStore},
    utils::PasswordConfig,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "SecurePass123";
const MULTIPART_BOUNDARY: &str = "classifieds-test-boundary";

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub media_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_dir);
    }
}

impl TestApp {
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PUT", uri)
    }

    pub fn patch(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PATCH", uri)
    }

    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "DELETE", uri)
    }

    /// Registers a user and returns `(access_token, user_id)`
    pub async fn register(&self, email: &str) -> (String, Uuid) {
        let response = self
            .post("/v1/auth/register")
            .json(&json!({
                "name": "Test Driver",
                "email": email,
                "password": TEST_PASSWORD,
                "password_confirmation": TEST_PASSWORD,
                "country": "Bulgaria",
                "city": "Sofia"
            }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "registration failed");

        let body: Value = response.json().await;
        let token = body["access_token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (token, user_id)
    }

    /// Creates a listing and returns its id, asserting 201
    pub async fn create_listing(&self, token: &str, body: &Value) -> Uuid {
        let response = self
            .post("/v1/listings")
            .bearer(token)
            .json(body)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "listing creation failed");

        let created: Value = response.json().await;
        created["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn upgrade(&self, token: &str, plan: &str) -> TestResponse {
        self.post("/v1/subscriptions/upgrade")
            .bearer(token)
            .json(&json!({ "plan": plan }))
            .send()
            .await
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: &'static str,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &'static str, uri: &str) -> Self {
        Self {
            app,
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push((header::AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.headers
            .push((header::CONTENT_TYPE.to_string(), "application/json".to_string()));
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self
    }

    /// Multipart body with one part per `(field, content_type, bytes)`
    pub fn multipart(mut self, files: &[(&str, &str, &[u8])]) -> Self {
        let mut body = Vec::new();
        for (index, (field, content_type, bytes)) in files.iter().enumerate() {
            body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"upload-{}\"\r\n",
                    field, index
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        self.headers.push((
            header::CONTENT_TYPE.to_string(),
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        ));
        self.body = Body::from(body);
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.body(self.body).unwrap();

        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}

/// Router over a fresh in-memory store
pub fn setup_test_app() -> TestApp {
    let media_dir = std::env::temp_dir().join(format!("classifieds-test-{}", Uuid::new_v4()));

    let mut config = AppConfig::for_test();
    config.media.storage_dir = media_dir.to_string_lossy().into_owned();
    config.features.enable_openapi = true;

    let store: Arc<dyn MarketplaceStore> = Arc::new(MemoryStore::new());
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::from_config(&config.media));
    let state = AppState::new(config, store, media, PasswordConfig::for_test());

    TestApp {
        app: build_router(state.clone()),
        state,
        media_dir,
    }
}

pub fn unique_email() -> String {
    format!("driver-{}@example.com", Uuid::new_v4().simple())
}

/// Seeded category id for a slug such as `go-karts`
pub fn category_id(slug: &str) -> Uuid {
    DEFAULT_CATEGORIES
        .iter()
        .find(|(_, _, s)| *s == slug)
        .map(|(id, _, _)| id.parse().unwrap())
        .unwrap_or_else(|| panic!("unknown category {}", slug))
}

pub fn listing_body(title: &str, category: &str, status: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{} in good shape", title),
        "category_id": category_id(category),
        "condition": "used",
        "price": "1500.00",
        "currency": "EUR",
        "country": "Bulgaria",
        "city": "Sofia",
        "status": status
    })
}
