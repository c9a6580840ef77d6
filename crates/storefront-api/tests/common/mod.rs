//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use storefront_api::build_router;
use storefront_api::state::AppState;
use storefront_catalog::memory_catalog::InMemoryCatalog;
use storefront_catalog::pg_catalog_store::PgCatalogStore;
use storefront_checkout::retry::RetryPolicy;
use storefront_core::repository::EventRepository;
use storefront_event_store::memory_event_repository::InMemoryEventRepository;
use storefront_event_store::pg_event_repository::PgEventRepository;
use storefront_test_support::{FixedClock, fixed_now};
use tower::ServiceExt;

const CATALOG_JSON: &str = r#"[
  { "_id": "p1", "name": "Pineapple", "price": 500, "category": "Fruit", "rating": 4.5, "reviews": 12 },
  { "_id": "p2", "name": "Mango", "price": 1500, "category": "Fruit", "rating": 3.0 },
  { "_id": "p3", "name": "Espresso Beans", "price": 1200, "category": "Coffee", "rating": 4.8, "originalPrice": 1500 }
]"#;

fn retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1))
}

/// Build the full app router over in-memory stores with a fixed clock. Uses
/// the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    build_test_app_with_repository(Arc::new(InMemoryEventRepository::new()))
}

/// Build the full app router over the given event repository.
pub fn build_test_app_with_repository(event_repository: Arc<dyn EventRepository>) -> Router {
    let catalog = InMemoryCatalog::parse(Path::new("catalog.json"), CATALOG_JSON).unwrap();
    build_router(AppState::new(
        Arc::new(FixedClock(fixed_now())),
        event_repository,
        Arc::new(catalog),
        retry(),
    ))
}

/// Build the full app router over PostgreSQL stores.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    build_router(AppState::new(
        Arc::new(FixedClock(fixed_now())),
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgCatalogStore::new(pool)),
        retry(),
    ))
}

/// Send a request with an optional JSON body and extra headers.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body), &[]).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None, &[]).await
}

/// A complete shipping address.
pub fn address() -> serde_json::Value {
    serde_json::json!({
        "fullName": "Ada Lovelace",
        "line1": "1 Main St",
        "city": "Springfield",
        "postalCode": "62701",
        "country": "US"
    })
}
