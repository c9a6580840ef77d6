//! Product listing filter.

use serde::Deserialize;
use storefront_core::error::DomainError;
use storefront_core::money::Money;

use crate::product::{MAX_RATING, Product};

/// Criteria for `list_products`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    /// Exact category, compared case-insensitively.
    pub category: Option<String>,
    /// Free text searched in name and category, case-insensitively.
    pub q: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Money>,
    /// Inclusive upper price bound.
    pub max_price: Option<Money>,
    /// Inclusive lower rating bound.
    pub min_rating: Option<f32>,
}

impl ProductFilter {
    /// Returns a copy with blank text criteria dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the price bounds are inverted or
    /// the rating bound is out of range.
    pub fn normalized(&self) -> Result<Self, DomainError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(DomainError::Validation(format!(
                "minPrice {} exceeds maxPrice {}",
                min.minor_units(),
                max.minor_units()
            )));
        }
        if let Some(rating) = self.min_rating
            && !(0.0..=MAX_RATING).contains(&rating)
        {
            return Err(DomainError::Validation(format!(
                "minRating {rating} is outside 0..={MAX_RATING}"
            )));
        }
        Ok(Self {
            category: non_blank(self.category.as_deref()),
            q: non_blank(self.q.as_deref()),
            ..self.clone()
        })
    }

    /// Returns `true` if `product` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self
            .category
            .as_ref()
            .is_some_and(|category| !product.category.eq_ignore_ascii_case(category))
        {
            return false;
        }
        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.min_rating.is_some_and(|min| product.rating < min) {
            return false;
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
