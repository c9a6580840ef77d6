//! Aggregate roots for the Order Ledger context.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::aggregate::AggregateRoot;
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::event::EventMetadata;
use storefront_core::identity::{ProductId, UserId, keyed_stream_id, user_stream_id};
use storefront_core::money::Money;
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

use super::address::ShippingAddress;
use super::events::{
    OrderEvent, OrderEventKind, OrderHistoryEvent, OrderHistoryEventKind, OrderPlaced,
    OrderRecorded, StatusAdvanced,
};
use super::status::OrderStatus;

/// Namespace for deriving order ids from (user, idempotency key).
pub const ORDER_NAMESPACE: Uuid = Uuid::from_u128(0x2b8e_51c7_93f0_4d6a_a1e4_0c57_d92b_3f18);

/// Namespace for order ids of checkouts that carried no idempotency key.
///
/// Kept apart from `ORDER_NAMESPACE` so no client key can select the order
/// of a keyless checkout.
pub const DERIVED_ORDER_NAMESPACE: Uuid =
    Uuid::from_u128(0x4d71_e0a9_c35b_4f26_8e1d_79b2_06fa_c583);

/// Namespace for deriving order history stream ids from user ids.
pub const ORDER_HISTORY_NAMESPACE: Uuid =
    Uuid::from_u128(0x9f04_6ad3_27be_4c85_b3d1_e68a_104c_7a29);

/// Maximum accepted idempotency key length, in bytes.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Derives the order id for a checkout of `user_id` under `idempotency_key`.
#[must_use]
pub fn order_id(user_id: &UserId, idempotency_key: &str) -> Uuid {
    keyed_stream_id(&ORDER_NAMESPACE, user_id, idempotency_key)
}

/// Derives the order id of a checkout.
///
/// A client key selects the order on its own; without one, the id is derived
/// from the cart version the snapshot was taken at.
#[must_use]
pub fn checkout_order_id(
    user_id: &UserId,
    idempotency_key: Option<&str>,
    cart_version: i64,
) -> Uuid {
    match idempotency_key {
        Some(key) => order_id(user_id, key),
        None => keyed_stream_id(&DERIVED_ORDER_NAMESPACE, user_id, &cart_version.to_string()),
    }
}

/// Returns the stream id of a user's order history.
#[must_use]
pub fn order_history_id(user_id: &UserId) -> Uuid {
    user_stream_id(&ORDER_HISTORY_NAMESPACE, user_id)
}

/// A product and quantity to purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Product fields captured in the cart.
    pub product: ProductSnapshot,
    /// Purchased quantity, at least 1.
    pub quantity: u32,
}

/// One purchased line, frozen at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price captured when the product entered the cart.
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: u32,
    pub line_total: Money,
}

impl OrderLine {
    fn from_item(item: &OrderItem) -> Result<Self, DomainError> {
        if item.quantity == 0 {
            return Err(DomainError::Validation(format!(
                "order line for {} has quantity 0",
                item.product.product_id
            )));
        }
        Ok(Self {
            product_id: item.product.product_id.clone(),
            name: item.product.name.clone(),
            price: item.product.unit_price,
            image: item.product.image.clone(),
            category: item.product.category.clone(),
            quantity: item.quantity,
            line_total: item.product.unit_price.times(item.quantity)?,
        })
    }
}

/// The aggregate root for one order.
#[derive(Debug)]
pub struct Order {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Persisted version (event count).
    pub(crate) version: i64,
    pub(crate) placement: Option<OrderPlaced>,
    pub(crate) status: OrderStatus,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<OrderEvent>,
}

impl Order {
    /// Creates an empty aggregate for the given order id.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            placement: None,
            status: OrderStatus::Placed,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the placement record, or `None` if the order does not exist.
    #[must_use]
    pub fn placement(&self) -> Option<&OrderPlaced> {
        self.placement.as_ref()
    }

    /// Returns `true` once the order has been placed.
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.placement.is_some()
    }

    /// Returns `true` if `user_id` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.placement
            .as_ref()
            .is_some_and(|placement| &placement.user_id == user_id)
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    fn record(&mut self, kind: OrderEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = OrderEvent {
            metadata: EventMetadata::new(
                kind.event_type(),
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind,
        };
        self.mutate(&event.kind);
        self.uncommitted_events.push(event);
    }

    fn mutate(&mut self, kind: &OrderEventKind) {
        match kind {
            OrderEventKind::OrderPlaced(payload) => {
                self.placement = Some(payload.clone());
                self.status = OrderStatus::Placed;
            }
            OrderEventKind::StatusAdvanced(payload) => {
                self.status = payload.to;
            }
        }
    }

    /// Places the order: freezes the lines, computes the total and sets the
    /// status to `Placed`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the order already exists,
    /// `DomainError::EmptyCart` for an empty item list, and
    /// `DomainError::Validation` for a zero quantity, an overflowing total,
    /// a bad idempotency key or an incomplete address.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        user_id: UserId,
        idempotency_key: Option<&str>,
        cart_version: i64,
        items: &[OrderItem],
        address: &ShippingAddress,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.is_placed() {
            return Err(DomainError::Conflict(format!(
                "order {} already exists",
                self.id
            )));
        }
        if items.is_empty() {
            return Err(DomainError::EmptyCart(user_id.to_string()));
        }
        let idempotency_key = idempotency_key
            .map(validate_idempotency_key)
            .transpose()?;
        let address = address.normalized()?;
        let lines = items
            .iter()
            .map(OrderLine::from_item)
            .collect::<Result<Vec<_>, _>>()?;
        let total = lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.plus(line.line_total))?;

        self.record(
            OrderEventKind::OrderPlaced(OrderPlaced {
                user_id,
                idempotency_key,
                cart_version,
                lines,
                total,
                address,
                placed_at: clock.now(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Moves the order to `next`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the order was never placed and
    /// `DomainError::InvalidTransition` if the lifecycle forbids the move.
    pub fn advance_status(
        &mut self,
        next: OrderStatus,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.is_placed() {
            return Err(DomainError::NotFound(format!("order {}", self.id)));
        }
        let from = self.status;
        let to = from.transition_to(next)?;
        self.record(
            OrderEventKind::StatusAdvanced(StatusAdvanced { from, to }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

/// Trims an idempotency key and checks it is usable.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the key is blank, too long or
/// contains control characters.
pub fn validate_idempotency_key(raw: &str) -> Result<String, DomainError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(DomainError::Validation(
            "idempotency key must not be blank".to_owned(),
        ));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(DomainError::Validation(format!(
            "idempotency key exceeds {MAX_IDEMPOTENCY_KEY_LEN} bytes"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(DomainError::Validation(
            "idempotency key must not contain control characters".to_owned(),
        ));
    }
    Ok(key.to_owned())
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}

/// The aggregate root for a user's list of placed orders.
#[derive(Debug)]
pub struct OrderHistory {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Persisted version (event count).
    pub(crate) version: i64,
    /// Recorded orders, oldest first.
    entries: Vec<OrderRecorded>,
    known: HashSet<Uuid>,
    uncommitted_events: Vec<OrderHistoryEvent>,
}

impl OrderHistory {
    /// Creates an empty history for a user.
    #[must_use]
    pub fn new(user_id: &UserId) -> Self {
        Self {
            id: order_history_id(user_id),
            version: 0,
            entries: Vec::new(),
            known: HashSet::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Recorded orders in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[OrderRecorded] {
        &self.entries
    }

    /// Returns `true` if `order_id` is already recorded.
    #[must_use]
    pub fn contains(&self, order_id: Uuid) -> bool {
        self.known.contains(&order_id)
    }

    fn mutate(&mut self, kind: &OrderHistoryEventKind) {
        match kind {
            OrderHistoryEventKind::OrderRecorded(payload) => {
                if self.known.insert(payload.order_id) {
                    self.entries.push(payload.clone());
                }
            }
        }
    }

    /// Adds an order to the history. Recording the same order twice records
    /// nothing the second time.
    pub fn record_order(
        &mut self,
        order_id: Uuid,
        recorded_at: DateTime<Utc>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        if self.contains(order_id) {
            return;
        }
        let kind = OrderHistoryEventKind::OrderRecorded(OrderRecorded {
            order_id,
            recorded_at,
        });
        let event = OrderHistoryEvent {
            metadata: EventMetadata::new(
                kind.event_type(),
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind,
        };
        self.mutate(&event.kind);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for OrderHistory {
    type Event = OrderHistoryEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(&event.kind);
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn clear_uncommitted_events(&mut self) {
        self.version += self.uncommitted_events.len() as i64;
        self.uncommitted_events.clear();
    }
}
