//! Route for the Checkout Coordinator.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use storefront_checkout::coordinator::{Checkout, handle_checkout};
use storefront_checkout::phase::CheckoutPhase;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;
use storefront_orders::application::query_handlers::OrderView;
use storefront_orders::domain::address::ShippingAddress;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, IDEMPOTENCY_KEY_HEADER};
use crate::state::AppState;

/// Response header set when a checkout resolved to an existing order.
pub const REPLAYED_HEADER: &str = "idempotent-replayed";

/// Request body for POST /checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: String,
    pub address: ShippingAddress,
    /// Overrides the `Idempotency-Key` header when both are sent.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Response body for POST /checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: OrderView,
    pub replayed: bool,
    pub phase: CheckoutPhase,
}

fn idempotency_key(
    headers: &HeaderMap,
    body_key: Option<String>,
) -> Result<Option<String>, DomainError> {
    let header_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value.to_str().map(str::to_owned).map_err(|_| {
                DomainError::Validation(format!("{IDEMPOTENCY_KEY_HEADER} is not valid text"))
            })
        })
        .transpose()?;
    match (body_key, header_key) {
        (Some(body), Some(header)) if body.trim() != header.trim() => Err(
            DomainError::Validation("idempotency key differs between body and header".into()),
        ),
        (Some(key), _) | (None, Some(key)) => Ok(Some(key)),
        (None, None) => Ok(None),
    }
}

/// POST /checkout
#[instrument(skip(state, headers, request), fields(user_id = %request.user_id))]
async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Response, ApiError> {
    let command = Checkout {
        correlation_id: Uuid::new_v4(),
        user_id: UserId::parse(&request.user_id)?,
        address: request.address,
        idempotency_key: idempotency_key(&headers, request.idempotency_key)?,
    };

    info!(correlation_id = %command.correlation_id, "handling checkout");

    let outcome = handle_checkout(&command, state.checkout_deps()).await?;

    let mut response = (
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: outcome.order,
            replayed: outcome.replayed,
            phase: outcome.phase,
        }),
    )
        .into_response();
    if outcome.replayed {
        response.headers_mut().insert(
            HeaderName::from_static(REPLAYED_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    Ok(response)
}

/// Returns the router for checkout.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}
