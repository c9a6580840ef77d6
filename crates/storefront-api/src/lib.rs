//! Storefront — HTTP API.
//!
//! Exposes the cart, checkout, order, wishlist and catalog operations as a
//! JSON REST surface over axum.

pub mod config;
pub mod error;
pub mod extract;
pub mod observability;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with every route mounted.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/products", routes::products::router())
        .nest("/cart", routes::cart::router())
        .nest("/checkout", routes::checkout::router())
        .nest("/orders", routes::orders::router())
        .nest("/users", routes::orders::users_router())
        .nest("/wishlist", routes::wishlist::router())
        .with_state(state)
}
