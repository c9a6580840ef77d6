//! Denormalized product display fields.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identity::ProductId;
use crate::money::Money;

/// Maximum accepted product name length, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Product fields captured when a product enters a cart or wishlist.
///
/// The capture is a copy: later catalog edits do not change what a cart,
/// wishlist or order displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Catalog identifier of the product.
    pub product_id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price at capture time.
    pub unit_price: Money,
    /// Image reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Catalog category, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductSnapshot {
    /// Builds a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is blank or too long.
    pub fn new(
        product_id: ProductId,
        name: &str,
        unit_price: Money,
        image: Option<String>,
        category: Option<String>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(format!(
                "product {product_id} has a blank name"
            )));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "product {product_id} name exceeds {MAX_NAME_LEN} bytes"
            )));
        }
        Ok(Self {
            product_id,
            name: name.to_owned(),
            unit_price,
            image: image.filter(|s| !s.trim().is_empty()),
            category: category.filter(|s| !s.trim().is_empty()),
        })
    }
}
