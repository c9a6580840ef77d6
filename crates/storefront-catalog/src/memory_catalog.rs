//! In-memory `CatalogStore`, optionally seeded from a JSON or YAML file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use storefront_core::error::DomainError;
use storefront_core::identity::ProductId;
use tracing::info;

use crate::filter::ProductFilter;
use crate::product::Product;
use crate::store::CatalogStore;

/// Process-local catalog. Products keep the order they were loaded in.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl InMemoryCatalog {
    /// Builds a catalog from validated products.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an invalid product or a
    /// duplicate id.
    pub fn from_products(products: Vec<Product>) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            product.validate()?;
            if index.insert(product.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
        }
        Ok(Self { products, index })
    }

    /// Parses a product list. `.yaml` and `.yml` files are read as YAML,
    /// anything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the document does not parse or
    /// holds invalid products.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, DomainError> {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let products: Vec<Product> = if is_yaml {
            serde_yaml::from_str(contents).map_err(|e| {
                DomainError::Validation(format!("catalog {}: {e}", path.display()))
            })?
        } else {
            serde_json::from_str(contents).map_err(|e| {
                DomainError::Validation(format!("catalog {}: {e}", path.display()))
            })?
        };
        Self::from_products(products)
    }

    /// Reads and parses a catalog seed file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Upstream` if the file cannot be read and
    /// `DomainError::Validation` if it does not parse.
    pub async fn load(path: &Path) -> Result<Self, DomainError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Upstream(format!("catalog {}: {e}", path.display())))?;
        let catalog = Self::parse(path, &contents)?;
        info!(path = %path.display(), products = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in load order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, DomainError> {
        self.index
            .get(product_id)
            .map(|&position| self.products[position].clone())
            .ok_or_else(|| DomainError::NotFound(format!("product {product_id}")))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError> {
        let filter = filter.normalized()?;
        Ok(self
            .products
            .iter()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect())
    }
}
