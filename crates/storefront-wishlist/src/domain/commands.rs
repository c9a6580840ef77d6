//! Commands for the Wishlist Ledger context.

use storefront_core::identity::{ProductId, UserId};
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

/// Command to save a product to a user's wishlist.
#[derive(Debug, Clone)]
pub struct AddToWishlist {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The wishlist owner.
    pub user_id: UserId,
    /// Product fields to capture.
    pub product: ProductSnapshot,
}

/// Command to remove a product from a user's wishlist.
#[derive(Debug, Clone)]
pub struct RemoveFromWishlist {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The wishlist owner.
    pub user_id: UserId,
    /// The product to remove.
    pub product_id: ProductId,
}
