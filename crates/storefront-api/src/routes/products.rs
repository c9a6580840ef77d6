//! Routes for the Catalog Store.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use storefront_catalog::filter::ProductFilter;
use storefront_catalog::product::Product;
use storefront_core::error::DomainError;
use storefront_core::identity::ProductId;
use storefront_core::money::Money;
use storefront_core::product::ProductSnapshot;
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Product fields a client sends when adding to a cart or wishlist.
///
/// Accepts the catalog's own JSON shape, so a product fetched from
/// `GET /products` can be posted back as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[serde(alias = "_id", alias = "productId")]
    pub id: String,
    pub name: String,
    #[serde(alias = "unitPrice")]
    pub price: Money,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductPayload {
    /// Validates the payload into the snapshot stored with a cart line.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a bad id or name.
    pub fn into_snapshot(self) -> Result<ProductSnapshot, DomainError> {
        ProductSnapshot::new(
            ProductId::parse(&self.id)?,
            &self.name,
            self.price,
            self.image,
            self.category,
        )
    }
}

/// GET /products
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.catalog.list_products(&filter).await?;
    Ok(Json(products))
}

/// GET /products/{product_id}
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = ProductId::parse(&product_id)?;
    let product = state.catalog.get_product(&product_id).await?;
    Ok(Json(product))
}

/// Returns the router for the catalog.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{product_id}", get(get_product))
}
