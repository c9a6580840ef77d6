//! Domain events for the Cart Ledger context.

use serde::{Deserialize, Serialize};
use storefront_core::event::{DomainEvent, EventMetadata};
use storefront_core::identity::{ProductId, UserId};
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

/// Event type for `ItemAdded`.
pub const ITEM_ADDED_EVENT_TYPE: &str = "cart.item_added";
/// Event type for `QuantitySet`.
pub const QUANTITY_SET_EVENT_TYPE: &str = "cart.quantity_set";
/// Event type for `ItemRemoved`.
pub const ITEM_REMOVED_EVENT_TYPE: &str = "cart.item_removed";
/// Event type for `CheckoutStarted`.
pub const CHECKOUT_STARTED_EVENT_TYPE: &str = "cart.checkout_started";
/// Event type for `CheckoutSettled`.
pub const CHECKOUT_SETTLED_EVENT_TYPE: &str = "cart.checkout_settled";
/// Event type for `CheckoutAbandoned`.
pub const CHECKOUT_ABANDONED_EVENT_TYPE: &str = "cart.checkout_abandoned";

/// Emitted when a quantity of a product is added to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAdded {
    /// Owner of the cart.
    pub user_id: UserId,
    /// Product fields captured at add time.
    pub product: ProductSnapshot,
    /// Quantity added (the delta, not the resulting total).
    pub quantity: u32,
}

/// Emitted when an entry's quantity is overwritten with a positive value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitySet {
    /// The product whose entry changed.
    pub product_id: ProductId,
    /// The new quantity.
    pub quantity: u32,
}

/// Emitted when an entry is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The product whose entry was deleted.
    pub product_id: ProductId,
}

/// One line of a checkout snapshot, as subtracted from the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledLine {
    /// The purchased product.
    pub product_id: ProductId,
    /// The purchased quantity.
    pub quantity: u32,
}

/// Emitted before a snapshot is turned into an order. Stays pending until
/// the checkout is settled or abandoned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStarted {
    /// The order the snapshot is becoming.
    pub order_id: Uuid,
    /// Cart version the snapshot was taken at.
    pub cart_version: i64,
}

/// Emitted when the lines of a checkout snapshot are removed from the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettled {
    /// The order the snapshot became.
    pub order_id: Uuid,
    /// Cart version the snapshot was taken at.
    pub cart_version: i64,
    /// Quantities removed. Units that entered the cart after the snapshot
    /// are never part of these.
    pub lines: Vec<SettledLine>,
}

/// Emitted when a started checkout turned out to have no order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutAbandoned {
    /// The order that was never placed.
    pub order_id: Uuid,
}

/// Event payload variants for the Cart Ledger context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CartEventKind {
    /// A product quantity has been added.
    ItemAdded(ItemAdded),
    /// A quantity has been overwritten.
    QuantitySet(QuantitySet),
    /// An entry has been deleted.
    ItemRemoved(ItemRemoved),
    /// A checkout has started turning a snapshot into an order.
    CheckoutStarted(CheckoutStarted),
    /// Purchased snapshot lines have been removed.
    CheckoutSettled(CheckoutSettled),
    /// A started checkout has been given up.
    CheckoutAbandoned(CheckoutAbandoned),
}

impl CartEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ItemAdded(_) => ITEM_ADDED_EVENT_TYPE,
            Self::QuantitySet(_) => QUANTITY_SET_EVENT_TYPE,
            Self::ItemRemoved(_) => ITEM_REMOVED_EVENT_TYPE,
            Self::CheckoutStarted(_) => CHECKOUT_STARTED_EVENT_TYPE,
            Self::CheckoutSettled(_) => CHECKOUT_SETTLED_EVENT_TYPE,
            Self::CheckoutAbandoned(_) => CHECKOUT_ABANDONED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Cart Ledger context.
#[derive(Debug, Clone)]
pub struct CartEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CartEventKind,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("CartEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
