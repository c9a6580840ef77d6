//! Domain events for the Order Ledger context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::event::{DomainEvent, EventMetadata};
use storefront_core::identity::UserId;
use storefront_core::money::Money;
use uuid::Uuid;

use super::address::ShippingAddress;
use super::aggregates::OrderLine;
use super::status::OrderStatus;

/// Event type for `OrderPlaced`.
pub const ORDER_PLACED_EVENT_TYPE: &str = "order.placed";
/// Event type for `StatusAdvanced`.
pub const STATUS_ADVANCED_EVENT_TYPE: &str = "order.status_advanced";
/// Event type for `OrderRecorded`.
pub const ORDER_RECORDED_EVENT_TYPE: &str = "order_history.order_recorded";

/// Emitted once, when an order is created from a cart snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The purchasing user.
    pub user_id: UserId,
    /// The client idempotency key the order id was derived from. `None` for
    /// a keyless checkout.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Cart stream version the snapshot was taken at.
    pub cart_version: i64,
    /// Purchased lines, copied from the snapshot.
    pub lines: Vec<OrderLine>,
    /// Σ line totals.
    pub total: Money,
    /// Where the order ships to.
    pub address: ShippingAddress,
    /// Creation time.
    pub placed_at: DateTime<Utc>,
}

/// Emitted when an order's status moves along its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusAdvanced {
    /// Status before the change.
    pub from: OrderStatus,
    /// Status after the change.
    pub to: OrderStatus,
}

/// Event payload variants for an order stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// The order has been created.
    OrderPlaced(OrderPlaced),
    /// The status has changed.
    StatusAdvanced(StatusAdvanced),
}

impl OrderEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderPlaced(_) => ORDER_PLACED_EVENT_TYPE,
            Self::StatusAdvanced(_) => STATUS_ADVANCED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for an order stream.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("OrderEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

/// Emitted when an order is added to its owner's history.
///
/// Checkout records the order before placing it, so an entry may name an
/// order that was never created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecorded {
    /// The recorded order.
    pub order_id: Uuid,
    /// When the order was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Event payload variants for a per-user order history stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderHistoryEventKind {
    /// An order has been recorded.
    OrderRecorded(OrderRecorded),
}

impl OrderHistoryEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderRecorded(_) => ORDER_RECORDED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for an order history stream.
#[derive(Debug, Clone)]
pub struct OrderHistoryEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderHistoryEventKind,
}

impl DomainEvent for OrderHistoryEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind)
            .expect("OrderHistoryEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
