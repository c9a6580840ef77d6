//! Commands for the Order Ledger context.

use chrono::{DateTime, Utc};
use storefront_core::identity::UserId;
use uuid::Uuid;

use super::address::ShippingAddress;
use super::aggregates::OrderItem;
use super::status::OrderStatus;

/// Command to create an order from a cart snapshot.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The purchasing user.
    pub user_id: UserId,
    /// Client key the order id is derived from, if the client sent one.
    pub idempotency_key: Option<String>,
    /// Cart stream version the snapshot was taken at. Derives the order id
    /// of a keyless checkout.
    pub cart_version: i64,
    /// Snapshot lines to purchase.
    pub items: Vec<OrderItem>,
    /// Where the order ships to.
    pub address: ShippingAddress,
}

/// Command to add an order to its owner's history.
#[derive(Debug, Clone)]
pub struct RecordOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order owner.
    pub user_id: UserId,
    /// The order being placed.
    pub order_id: Uuid,
    /// When the order is recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Command to move an order along its lifecycle.
#[derive(Debug, Clone)]
pub struct AdvanceStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The requesting user; must own the order.
    pub user_id: UserId,
    /// The order to change.
    pub order_id: Uuid,
    /// Requested status.
    pub next: OrderStatus,
}
