//! Routes for the Wishlist Ledger bounded context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use storefront_core::identity::{ProductId, UserId};
use storefront_wishlist::application::command_handlers;
use storefront_wishlist::application::query_handlers::{self, WishlistView};
use storefront_wishlist::domain::commands;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::routes::products::ProductPayload;
use crate::state::AppState;

/// Request body for POST /wishlist/add.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub user_id: String,
    pub product: ProductPayload,
}

/// Request body for POST /wishlist/remove.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub user_id: String,
    pub product_id: String,
}

/// POST /wishlist/add
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn add(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddRequest>,
) -> Result<Json<WishlistView>, ApiError> {
    let command = commands::AddToWishlist {
        correlation_id: Uuid::new_v4(),
        user_id: UserId::parse(&request.user_id)?,
        product: request.product.into_snapshot()?,
    };

    info!(correlation_id = %command.correlation_id, "handling add_to_wishlist command");

    let result = command_handlers::handle_add_to_wishlist(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &state.wishlist_locks,
    )
    .await?;

    Ok(Json(result.wishlist))
}

/// POST /wishlist/remove
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn remove(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RemoveRequest>,
) -> Result<Json<WishlistView>, ApiError> {
    let command = commands::RemoveFromWishlist {
        correlation_id: Uuid::new_v4(),
        user_id: UserId::parse(&request.user_id)?,
        product_id: ProductId::parse(&request.product_id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_from_wishlist command");

    let result = command_handlers::handle_remove_from_wishlist(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &state.wishlist_locks,
    )
    .await?;

    Ok(Json(result.wishlist))
}

/// GET /wishlist/{user_id}
#[instrument(skip(state))]
async fn get_wishlist(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<WishlistView>, ApiError> {
    let user_id = UserId::parse(&user_id)?;
    let wishlist = query_handlers::get_wishlist(&user_id, &*state.event_repository).await?;
    Ok(Json(wishlist))
}

/// Returns the router for the wishlist context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add))
        .route("/remove", post(remove))
        .route("/{user_id}", get(get_wishlist))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::routes::testing::TestApp;

    fn save(id: &str) -> serde_json::Value {
        json!({
            "userId": "alice",
            "product": { "_id": id, "name": format!("Product {id}"), "price": 250 }
        })
    }

    #[tokio::test]
    async fn test_add_is_set_semantics() {
        // Arrange
        let app = TestApp::new();
        app.request(router(), "POST", "/add", Some(save("p1"))).await;

        // Act
        let (status, json) = app.request(router(), "POST", "/add", Some(save("p1"))).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
        assert_eq!(json["items"][0]["productId"], "p1");
        assert_eq!(json["version"], 1);
    }

    #[tokio::test]
    async fn test_remove_absent_product_is_a_no_op() {
        let app = TestApp::new();
        app.request(router(), "POST", "/add", Some(save("p1"))).await;

        let (status, json) = app
            .request(
                router(),
                "POST",
                "/remove",
                Some(json!({ "userId": "alice", "productId": "p2" })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_returns_entries_in_insertion_order() {
        let app = TestApp::new();
        app.request(router(), "POST", "/add", Some(save("p2"))).await;
        app.request(router(), "POST", "/add", Some(save("p1"))).await;
        app.request(
            router(),
            "POST",
            "/remove",
            Some(json!({ "userId": "alice", "productId": "p2" })),
        )
        .await;

        let (status, json) = app.request(router(), "GET", "/alice", None).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = json["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["productId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_empty() {
        let app = TestApp::new();

        let (status, json) = app.request(router(), "GET", "/nobody", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["items"], json!([]));
    }
}
