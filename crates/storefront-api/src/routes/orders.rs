//! Routes for the Order Ledger bounded context.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;
use storefront_orders::application::command_handlers;
use storefront_orders::application::query_handlers::{self, OrderView};
use storefront_orders::domain::commands;
use storefront_orders::domain::status::OrderStatus;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, RequestingUser};
use crate::state::AppState;

/// Request body for POST /orders/{id}/status.
#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: String,
}

/// GET /orders/{id}
///
/// A UUID addresses a single order and requires the `x-user-id` header; any
/// other value is a user id whose orders are listed.
#[instrument(skip(state, headers))]
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Ok(order_id) = Uuid::parse_str(&id) {
        let RequestingUser(requester) = RequestingUser::from_headers(&headers)?;
        let order =
            query_handlers::get_order(&requester, order_id, &*state.event_repository).await?;
        return Ok(Json(order).into_response());
    }
    let orders = list(&state, &id).await?;
    Ok(Json(orders).into_response())
}

/// GET /users/{user_id}/orders
#[instrument(skip(state))]
async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(list(&state, &user_id).await?))
}

async fn list(state: &AppState, user_id: &str) -> Result<Vec<OrderView>, ApiError> {
    let user_id = UserId::parse(user_id)?;
    Ok(query_handlers::list_orders(&user_id, &*state.event_repository).await?)
}

/// POST /orders/{id}/status
#[instrument(skip(state, request), fields(status = %request.status))]
async fn advance_status(
    State(state): State<AppState>,
    RequestingUser(requester): RequestingUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AdvanceStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id =
        Uuid::parse_str(&id).map_err(|_| DomainError::NotFound(format!("order {id}")))?;
    let command = commands::AdvanceStatus {
        correlation_id: Uuid::new_v4(),
        user_id: requester,
        order_id,
        next: request.status.parse::<OrderStatus>()?,
    };

    info!(correlation_id = %command.correlation_id, "handling advance_status command");

    let result = command_handlers::handle_advance_status(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.order))
}

/// Returns the router mounted at `/orders`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_by_id))
        .route("/{id}/status", post(advance_status))
}

/// Returns the router mounted at `/users`.
pub fn users_router() -> Router<AppState> {
    Router::new().route("/{user_id}/orders", get(list_for_user))
}
