//! Aggregate roots for the Cart Ledger context.

use std::collections::HashSet;

use storefront_core::aggregate::AggregateRoot;
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::event::EventMetadata;
use storefront_core::identity::{ProductId, UserId, user_stream_id};
use storefront_core::money::Money;
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

use super::events::{
    CartEvent, CartEventKind, CheckoutAbandoned, CheckoutSettled, CheckoutStarted, ItemAdded,
    ItemRemoved, QuantitySet, SettledLine,
};

/// Namespace for deriving cart stream ids from user ids.
pub const CART_NAMESPACE: Uuid = Uuid::from_u128(0x6c1d_92a4_0e57_4b1f_9d3a_5f2e_8c71_b640);

/// Returns the stream id of a user's cart.
#[must_use]
pub fn cart_id(user_id: &UserId) -> Uuid {
    user_stream_id(&CART_NAMESPACE, user_id)
}

/// One cart entry. Quantity is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    /// Product fields captured when the entry was created.
    pub product: ProductSnapshot,
    /// Quantity in the cart.
    pub quantity: u32,
    /// `(sequence number, quantity after)` for every event that touched the
    /// entry since it was created.
    changes: Vec<(i64, u32)>,
}

impl CartLine {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on overflow.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.product.unit_price.times(self.quantity)
    }

    /// Units still in the entry that were already there at `cart_version`.
    ///
    /// An entry created after that version holds none. Every later decrease
    /// is taken from the newer units first, so the count only drops when the
    /// entry falls below what it held at `cart_version`.
    #[must_use]
    pub fn units_held_since(&self, cart_version: i64) -> u32 {
        let mut held: Option<u32> = None;
        for &(sequence, quantity) in &self.changes {
            held = if sequence <= cart_version {
                Some(quantity)
            } else {
                held.map(|units| units.min(quantity))
            };
        }
        held.unwrap_or(0)
    }

    fn set(&mut self, sequence: i64, quantity: u32) {
        self.quantity = quantity;
        self.changes.push((sequence, quantity));
    }
}

/// A checkout that marked the cart but has not been settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCheckout {
    /// The order the snapshot is becoming.
    pub order_id: Uuid,
    /// Cart version the snapshot was taken at.
    pub cart_version: i64,
}

/// The aggregate root for one user's cart.
#[derive(Debug)]
pub struct Cart {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Persisted version (event count).
    pub(crate) version: i64,
    /// Owner of the cart.
    pub(crate) user_id: UserId,
    /// Entries in insertion order.
    lines: Vec<CartLine>,
    /// Started checkouts, oldest first.
    pending_checkouts: Vec<PendingCheckout>,
    /// Orders whose snapshot lines were already removed.
    settled_orders: HashSet<Uuid>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CartEvent>,
}

impl Cart {
    /// Creates an empty cart for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: cart_id(&user_id),
            version: 0,
            user_id,
            lines: Vec::new(),
            pending_checkouts: Vec::new(),
            settled_orders: HashSet::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the owner of the cart.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the entries in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the checkouts started but not yet settled or abandoned.
    #[must_use]
    pub fn pending_checkouts(&self) -> &[PendingCheckout] {
        &self.pending_checkouts
    }

    /// Returns `true` if the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the quantity of a product, if it has an entry.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.line(product_id).map(|line| line.quantity)
    }

    /// Returns `true` if the snapshot of `order_id` was already settled.
    #[must_use]
    pub fn is_settled(&self, order_id: Uuid) -> bool {
        self.settled_orders.contains(&order_id)
    }

    fn is_pending(&self, order_id: Uuid) -> bool {
        self.pending_checkouts
            .iter()
            .any(|pending| pending.order_id == order_id)
    }

    /// Σ(unit price × quantity) over all entries.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on overflow.
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        self.lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.plus(line.line_total()?))
    }

    fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| &line.product.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product.product_id == product_id)
    }

    fn record(&mut self, kind: CartEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let sequence = self.next_sequence_number();
        let event = CartEvent {
            metadata: EventMetadata::new(
                kind.event_type(),
                self.id,
                sequence,
                correlation_id,
                clock.now(),
            ),
            kind,
        };
        self.mutate(sequence, &event.kind);
        self.uncommitted_events.push(event);
    }

    fn mutate(&mut self, sequence: i64, kind: &CartEventKind) {
        match kind {
            CartEventKind::ItemAdded(payload) => {
                if let Some(line) = self.line_mut(&payload.product.product_id) {
                    let quantity = line.quantity.saturating_add(payload.quantity);
                    line.set(sequence, quantity);
                } else {
                    self.lines.push(CartLine {
                        product: payload.product.clone(),
                        quantity: payload.quantity,
                        changes: vec![(sequence, payload.quantity)],
                    });
                }
            }
            CartEventKind::QuantitySet(payload) => {
                if let Some(line) = self.line_mut(&payload.product_id) {
                    line.set(sequence, payload.quantity);
                }
            }
            CartEventKind::ItemRemoved(payload) => {
                self.lines
                    .retain(|line| line.product.product_id != payload.product_id);
            }
            CartEventKind::CheckoutStarted(payload) => {
                self.pending_checkouts.push(PendingCheckout {
                    order_id: payload.order_id,
                    cart_version: payload.cart_version,
                });
            }
            CartEventKind::CheckoutSettled(payload) => {
                for settled in &payload.lines {
                    if let Some(line) = self.line_mut(&settled.product_id) {
                        let quantity = line.quantity.saturating_sub(settled.quantity);
                        line.set(sequence, quantity);
                    }
                }
                self.lines.retain(|line| line.quantity > 0);
                self.pending_checkouts
                    .retain(|pending| pending.order_id != payload.order_id);
                self.settled_orders.insert(payload.order_id);
            }
            CartEventKind::CheckoutAbandoned(payload) => {
                self.pending_checkouts
                    .retain(|pending| pending.order_id != payload.order_id);
            }
        }
    }

    /// Adds `quantity` of a product: creates the entry with the captured
    /// product fields, or increments an existing entry (keeping the fields
    /// captured when it was created).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `quantity` is zero or the
    /// resulting quantity overflows.
    pub fn add_item(
        &mut self,
        product: ProductSnapshot,
        quantity: u32,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity to add must be at least 1".to_owned(),
            ));
        }
        let current = self.quantity_of(&product.product_id).unwrap_or(0);
        if current.checked_add(quantity).is_none() {
            return Err(DomainError::Validation(format!(
                "quantity of {} would overflow",
                product.product_id
            )));
        }
        self.record(
            CartEventKind::ItemAdded(ItemAdded {
                user_id: self.user_id.clone(),
                product,
                quantity,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Overwrites an entry's quantity; zero or below deletes it.
    ///
    /// Setting the quantity an entry already has records nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` when a positive quantity targets a
    /// product without an entry, and `DomainError::Validation` when the
    /// quantity exceeds the supported range.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if quantity <= 0 {
            self.remove_item(product_id, correlation_id, clock);
            return Ok(());
        }
        let quantity = u32::try_from(quantity).map_err(|_| {
            DomainError::Validation(format!("quantity {quantity} is out of range"))
        })?;
        match self.quantity_of(product_id) {
            None => Err(DomainError::NotFound(format!(
                "product {product_id} is not in the cart of {}",
                self.user_id
            ))),
            Some(current) if current == quantity => Ok(()),
            Some(_) => {
                self.record(
                    CartEventKind::QuantitySet(QuantitySet {
                        product_id: product_id.clone(),
                        quantity,
                    }),
                    correlation_id,
                    clock,
                );
                Ok(())
            }
        }
    }

    /// Deletes an entry. Absent entries are left alone.
    pub fn remove_item(&mut self, product_id: &ProductId, correlation_id: Uuid, clock: &dyn Clock) {
        if self.line(product_id).is_none() {
            return;
        }
        self.record(
            CartEventKind::ItemRemoved(ItemRemoved {
                product_id: product_id.clone(),
            }),
            correlation_id,
            clock,
        );
    }

    /// Marks a checkout of the snapshot taken at `cart_version` as started.
    /// A checkout already pending or settled records nothing.
    pub fn begin_checkout(
        &mut self,
        order_id: Uuid,
        cart_version: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        if self.is_pending(order_id) || self.is_settled(order_id) {
            return;
        }
        self.record(
            CartEventKind::CheckoutStarted(CheckoutStarted {
                order_id,
                cart_version,
            }),
            correlation_id,
            clock,
        );
    }

    /// Removes the purchased snapshot lines of `order_id`.
    ///
    /// From each entry, at most the units it has held since `cart_version`
    /// are taken, so units added after the snapshot stay in the cart even
    /// when the entry was removed and added again in between. Settling the
    /// same order twice records nothing.
    pub fn settle_checkout(
        &mut self,
        order_id: Uuid,
        cart_version: i64,
        lines: &[SettledLine],
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        if self.is_settled(order_id) {
            return;
        }
        let removed = lines
            .iter()
            .filter_map(|purchased| {
                let held = self
                    .line(&purchased.product_id)
                    .map_or(0, |line| line.units_held_since(cart_version));
                let quantity = purchased.quantity.min(held);
                (quantity > 0).then(|| SettledLine {
                    product_id: purchased.product_id.clone(),
                    quantity,
                })
            })
            .collect();
        self.record(
            CartEventKind::CheckoutSettled(CheckoutSettled {
                order_id,
                cart_version,
                lines: removed,
            }),
            correlation_id,
            clock,
        );
    }

    /// Drops a pending checkout whose order was never placed. Unknown
    /// checkouts record nothing.
    pub fn abandon_checkout(&mut self, order_id: Uuid, correlation_id: Uuid, clock: &dyn Clock) {
        if !self.is_pending(order_id) {
            return;
        }
        self.record(
            CartEventKind::CheckoutAbandoned(CheckoutAbandoned { order_id }),
            correlation_id,
            clock,
        );
    }
}

impl AggregateRoot for Cart {
    type Event = CartEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        self.mutate(event.metadata.sequence_number, &event.kind);
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
