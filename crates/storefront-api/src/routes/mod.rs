//! Route modules organized by bounded context.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod wishlist;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use serde_json::Value;
    use storefront_catalog::memory_catalog::InMemoryCatalog;
    use storefront_catalog::product::Product;
    use storefront_checkout::retry::RetryPolicy;
    use storefront_core::identity::ProductId;
    use storefront_core::money::Money;
    use storefront_core::repository::EventRepository;
    use storefront_event_store::memory_event_repository::InMemoryEventRepository;
    use storefront_test_support::{FixedClock, fixed_now};
    use tower::ServiceExt;

    use crate::state::AppState;

    pub(crate) fn catalog_product(
        id: &str,
        name: &str,
        price: i64,
        category: &str,
        rating: f32,
    ) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            name: name.to_owned(),
            price: Money::from_minor(price).unwrap(),
            category: category.to_owned(),
            original_price: None,
            rating,
            review_count: 0,
            image: None,
        }
    }

    pub(crate) struct TestApp {
        pub state: AppState,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::build(Arc::new(InMemoryEventRepository::new()), Vec::new())
        }

        pub fn with_catalog(products: Vec<Product>) -> Self {
            Self::build(Arc::new(InMemoryEventRepository::new()), products)
        }

        pub fn with_repository(repo: Arc<dyn EventRepository>) -> Self {
            Self::build(repo, Vec::new())
        }

        fn build(repo: Arc<dyn EventRepository>, products: Vec<Product>) -> Self {
            let catalog = InMemoryCatalog::from_products(products).unwrap();
            Self {
                state: AppState::new(
                    Arc::new(FixedClock(fixed_now())),
                    repo,
                    Arc::new(catalog),
                    RetryPolicy::new(1, Duration::from_millis(1)),
                ),
            }
        }

        pub async fn request(
            &self,
            router: Router<AppState>,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, _, json) = self
                .request_with_headers(router, method, uri, body, &[])
                .await;
            (status, json)
        }

        pub async fn request_with_headers(
            &self,
            router: Router<AppState>,
            method: &str,
            uri: &str,
            body: Option<Value>,
            headers: &[(&str, &str)],
        ) -> (StatusCode, HeaderMap, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = router
                .with_state(self.state.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = if body_bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&body_bytes).unwrap()
            };

            (status, headers, json)
        }
    }
}
