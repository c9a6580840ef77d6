//! Aggregate roots for the Wishlist Ledger context.

use storefront_core::aggregate::AggregateRoot;
use storefront_core::clock::Clock;
use storefront_core::event::EventMetadata;
use storefront_core::identity::{ProductId, UserId, user_stream_id};
use storefront_core::product::ProductSnapshot;
use uuid::Uuid;

use super::events::{ProductSaved, ProductUnsaved, WishlistEvent, WishlistEventKind};

/// Namespace for deriving wishlist stream ids from user ids.
pub const WISHLIST_NAMESPACE: Uuid = Uuid::from_u128(0x47a9_e0d2_6b3c_4f81_8e25_d1f0_9a6c_53b7);

/// Returns the stream id of a user's wishlist.
#[must_use]
pub fn wishlist_id(user_id: &UserId) -> Uuid {
    user_stream_id(&WISHLIST_NAMESPACE, user_id)
}

/// The aggregate root for one user's wishlist.
#[derive(Debug)]
pub struct Wishlist {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) version: i64,
    pub(crate) user_id: UserId,
    /// Saved products in insertion order, at most one per product id.
    entries: Vec<ProductSnapshot>,
    uncommitted_events: Vec<WishlistEvent>,
}

impl Wishlist {
    /// Creates an empty wishlist for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: wishlist_id(&user_id),
            version: 0,
            user_id,
            entries: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the owner of the wishlist.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Saved products in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ProductSnapshot] {
        &self.entries
    }

    /// Returns `true` if the product is saved.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|p| &p.product_id == product_id)
    }

    fn record(&mut self, kind: WishlistEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = WishlistEvent {
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

    fn mutate(&mut self, kind: &WishlistEventKind) {
        match kind {
            WishlistEventKind::ProductSaved(payload) => {
                if !self.contains(&payload.product.product_id) {
                    self.entries.push(payload.product.clone());
                }
            }
            WishlistEventKind::ProductUnsaved(payload) => {
                self.entries.retain(|p| p.product_id != payload.product_id);
            }
        }
    }

    /// Saves a product. Already-saved products are left as they are.
    pub fn save(&mut self, product: ProductSnapshot, correlation_id: Uuid, clock: &dyn Clock) {
        if self.contains(&product.product_id) {
            return;
        }
        self.record(
            WishlistEventKind::ProductSaved(ProductSaved {
                user_id: self.user_id.clone(),
                product,
            }),
            correlation_id,
            clock,
        );
    }

    /// Removes a product. Products that are not saved are ignored.
    pub fn unsave(&mut self, product_id: &ProductId, correlation_id: Uuid, clock: &dyn Clock) {
        if !self.contains(product_id) {
            return;
        }
        self.record(
            WishlistEventKind::ProductUnsaved(ProductUnsaved {
                product_id: product_id.clone(),
            }),
            correlation_id,
            clock,
        );
    }
}

impl AggregateRoot for Wishlist {
    type Event = WishlistEvent;

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
