//! Domain events for the Wishlist Ledger context.

use serde::{Deserialize, Serialize};
use storefront_core::event::{DomainEvent, EventMetadata};
use storefront_core::identity::{ProductId, UserId};
use storefront_core::product::ProductSnapshot;

/// Event type for `ProductSaved`.
pub const PRODUCT_SAVED_EVENT_TYPE: &str = "wishlist.product_saved";
/// Event type for `ProductUnsaved`.
pub const PRODUCT_UNSAVED_EVENT_TYPE: &str = "wishlist.product_unsaved";

/// Emitted when a product is saved to a wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSaved {
    /// Owner of the wishlist.
    pub user_id: UserId,
    /// Product fields captured at save time.
    pub product: ProductSnapshot,
}

/// Emitted when a product is removed from a wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUnsaved {
    /// The removed product.
    pub product_id: ProductId,
}

/// Event payload variants for the Wishlist Ledger context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WishlistEventKind {
    /// A product has been saved.
    ProductSaved(ProductSaved),
    /// A product has been removed.
    ProductUnsaved(ProductUnsaved),
}

impl WishlistEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProductSaved(_) => PRODUCT_SAVED_EVENT_TYPE,
            Self::ProductUnsaved(_) => PRODUCT_UNSAVED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Wishlist Ledger context.
#[derive(Debug, Clone)]
pub struct WishlistEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: WishlistEventKind,
}

impl DomainEvent for WishlistEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("WishlistEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
