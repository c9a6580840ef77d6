//! Catalog store abstraction.

use async_trait::async_trait;
use storefront_core::error::DomainError;
use storefront_core::identity::ProductId;

use crate::filter::ProductFilter;
use crate::product::Product;

/// Read access to published products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns one product.
    ///
    /// Fails with `DomainError::NotFound` if no such product is published.
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, DomainError>;

    /// Returns every product matching `filter`, in publication order.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError>;
}
