//! Catalog product record.

use serde::{Deserialize, Serialize};
use storefront_core::error::DomainError;
use storefront_core::identity::ProductId;
use storefront_core::money::Money;
use storefront_core::product::{MAX_NAME_LEN, ProductSnapshot};

/// Highest accepted rating.
pub const MAX_RATING: f32 = 5.0;

/// A published product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque catalog identifier.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in minor currency units.
    pub price: Money,
    /// Catalog category.
    pub category: String,
    /// Price before discount, if discounted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,
    /// Average review score, `0.0..=5.0`.
    #[serde(default)]
    pub rating: f32,
    /// Number of reviews behind `rating`.
    #[serde(default, alias = "reviews")]
    pub review_count: u32,
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    /// Checks the record can be published.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank or oversized name, a
    /// blank category, or a rating outside `0.0..=5.0`.
    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "product {} name must be 1..={MAX_NAME_LEN} bytes",
                self.id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "product {} has a blank category",
                self.id
            )));
        }
        if !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(DomainError::Validation(format!(
                "product {} rating {} is outside 0..={MAX_RATING}",
                self.id, self.rating
            )));
        }
        Ok(())
    }

    /// Captures the fields a cart or wishlist displays.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is unusable.
    pub fn snapshot(&self) -> Result<ProductSnapshot, DomainError> {
        ProductSnapshot::new(
            self.id.clone(),
            &self.name,
            self.price,
            self.image.clone(),
            Some(self.category.clone()),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, name: &str, price: i64, category: &str, rating: f32) -> Product {
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

    #[test]
    fn test_deserializes_document_aliases() {
        let json = serde_json::json!({
            "_id": "p1",
            "name": "Pineapple",
            "price": 500,
            "category": "Fruit",
            "originalPrice": 650,
            "rating": 4.5,
            "reviews": 12
        });

        let parsed: Product = serde_json::from_value(json).unwrap();

        assert_eq!(parsed.id.as_str(), "p1");
        assert_eq!(parsed.original_price.unwrap().minor_units(), 650);
        assert_eq!(parsed.review_count, 12);
        assert!(parsed.image.is_none());
    }

    #[test]
    fn test_negative_price_is_rejected_on_deserialize() {
        let json = serde_json::json!({
            "id": "p1", "name": "Pineapple", "price": -1, "category": "Fruit"
        });

        assert!(serde_json::from_value::<Product>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_rating() {
        let p = product("p1", "Pineapple", 500, "Fruit", 5.5);

        assert!(matches!(p.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_snapshot_copies_display_fields() {
        let p = product("p1", "Pineapple", 500, "Fruit", 4.0);

        let snapshot = p.snapshot().unwrap();

        assert_eq!(snapshot.product_id, p.id);
        assert_eq!(snapshot.unit_price, p.price);
        assert_eq!(snapshot.category.as_deref(), Some("Fruit"));
    }
}
