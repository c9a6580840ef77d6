//! Routes for the Cart Ledger bounded context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde::Deserialize;
use storefront_cart::application::command_handlers;
use storefront_cart::application::query_handlers::{self, CartView};
use storefront_cart::domain::commands;
use storefront_core::error::DomainError;
use storefront_core::identity::{ProductId, UserId};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Request body for POST /cart/add.
///
/// The product is named either by `productId` or by a `product` object as
/// returned from `GET /products`. Only its id is read; name and price come
/// from the catalog.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub user_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product: Option<ProductReference>,
    /// Units to add; defaults to one.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// The identifying part of a product object.
#[derive(Debug, Deserialize)]
pub struct ProductReference {
    #[serde(alias = "_id", alias = "productId")]
    pub id: String,
}

impl AddItemRequest {
    fn product_id(&self) -> Result<ProductId, DomainError> {
        match (&self.product_id, &self.product) {
            (Some(id), _) => ProductId::parse(id),
            (None, Some(product)) => ProductId::parse(&product.id),
            (None, None) => Err(DomainError::Validation(
                "productId or product is required".to_string(),
            )),
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// Request body for PUT /cart/{user_id}.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub product_id: String,
    /// New quantity; zero or less removes the line.
    pub quantity: i64,
}

/// POST /cart/add
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn add_item(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let user_id = UserId::parse(&request.user_id)?;
    let product = state.catalog.get_product(&request.product_id()?).await?;
    let command = commands::AddItem {
        correlation_id: Uuid::new_v4(),
        user_id,
        product: product.snapshot()?,
        quantity: request.quantity,
    };

    info!(correlation_id = %command.correlation_id, "handling add_item command");

    let result = command_handlers::handle_add_item(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &state.cart_locks,
    )
    .await?;

    Ok(Json(result.cart))
}

/// GET /cart/{user_id}
#[instrument(skip(state))]
async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let user_id = UserId::parse(&user_id)?;
    let cart = query_handlers::get_cart(&user_id, &*state.event_repository).await?;
    Ok(Json(cart))
}

/// PUT /cart/{user_id}
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
async fn set_quantity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<SetQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let command = commands::SetQuantity {
        correlation_id: Uuid::new_v4(),
        user_id: UserId::parse(&user_id)?,
        product_id: ProductId::parse(&request.product_id)?,
        quantity: request.quantity,
    };

    info!(correlation_id = %command.correlation_id, "handling set_quantity command");

    let result = command_handlers::handle_set_quantity(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &state.cart_locks,
    )
    .await?;

    Ok(Json(result.cart))
}

/// DELETE /cart/{user_id}/{product_id}
#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Result<Json<CartView>, ApiError> {
    let command = commands::RemoveItem {
        correlation_id: Uuid::new_v4(),
        user_id: UserId::parse(&user_id)?,
        product_id: ProductId::parse(&product_id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling remove_item command");

    let result = command_handlers::handle_remove_item(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &state.cart_locks,
    )
    .await?;

    Ok(Json(result.cart))
}

/// Returns the router for the cart context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_item))
        .route("/{user_id}", get(get_cart).put(set_quantity))
        .route("/{user_id}/{product_id}", delete(remove_item))
}
