//! Builders for common domain values.

use storefront_core::identity::{ProductId, UserId};
use storefront_core::money::Money;
use storefront_core::product::ProductSnapshot;

/// Parses a user id.
///
/// # Panics
///
/// Panics if `raw` is not a valid user id.
#[must_use]
pub fn user(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

/// Builds a product snapshot named after its id.
///
/// # Panics
///
/// Panics if `id` is blank or `price` is negative.
#[must_use]
pub fn product(id: &str, price: i64) -> ProductSnapshot {
    ProductSnapshot::new(
        ProductId::parse(id).unwrap(),
        &format!("Product {id}"),
        Money::from_minor(price).unwrap(),
        Some(format!("/images/{id}.jpg")),
        Some("fruit".to_owned()),
    )
    .unwrap()
}
