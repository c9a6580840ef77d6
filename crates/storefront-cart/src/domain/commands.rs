//! Commands for the Cart Ledger context.

use storefront_core::identity::{ProductId, UserId};
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

use super::events::SettledLine;

/// Command to add a quantity of a product to a user's cart.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// Product fields to capture if the entry is new.
    pub product: ProductSnapshot,
    /// Quantity to add, at least 1.
    pub quantity: u32,
}

/// Command to overwrite an entry's quantity.
#[derive(Debug, Clone)]
pub struct SetQuantity {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// The product whose entry changes.
    pub product_id: ProductId,
    /// New quantity; zero or below deletes the entry.
    pub quantity: i64,
}

/// Command to delete an entry.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// The product whose entry is deleted.
    pub product_id: ProductId,
}

/// Command to mark a checkout as started before its order is placed.
#[derive(Debug, Clone)]
pub struct BeginCheckout {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// The order the snapshot is becoming.
    pub order_id: Uuid,
    /// Cart version the snapshot was taken at.
    pub cart_version: i64,
}

/// Command to remove the purchased lines of a checkout snapshot.
#[derive(Debug, Clone)]
pub struct SettleCheckout {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// The order the snapshot became.
    pub order_id: Uuid,
    /// Cart version the snapshot was taken at.
    pub cart_version: i64,
    /// The purchased snapshot lines.
    pub lines: Vec<SettledLine>,
}

/// Command to drop a started checkout whose order was never placed.
#[derive(Debug, Clone)]
pub struct AbandonCheckout {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The cart owner.
    pub user_id: UserId,
    /// The order that was never placed.
    pub order_id: Uuid,
}
