//! Query handlers for the Cart Ledger context.
//!
//! Reads reconstitute the cart from its stream without taking the cart lock;
//! a single stream load is already a consistent point-in-time view.

use serde::Serialize;
use storefront_core::aggregate::AggregateRoot;
use storefront_core::error::DomainError;
use storefront_core::identity::{ProductId, UserId};
use storefront_core::money::Money;
use storefront_core::repository::EventRepository;

use crate::application::command_handlers::load_cart;
use crate::domain::aggregates::{Cart, CartLine, PendingCheckout};

/// One cart entry as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    /// Catalog identifier.
    pub product_id: ProductId,
    /// Captured display name.
    pub name: String,
    /// Captured unit price.
    pub price: Money,
    /// Captured image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Captured category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Quantity in the cart.
    pub quantity: u32,
    /// `price × quantity`.
    pub line_total: Money,
}

/// Read-only view of a user's cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Cart owner.
    pub user_id: UserId,
    /// Entries in insertion order.
    pub items: Vec<CartItemView>,
    /// Σ line totals.
    pub subtotal: Money,
    /// Stream version the view was built from.
    pub version: i64,
}

impl CartView {
    pub(crate) fn from_cart(cart: &Cart) -> Result<Self, DomainError> {
        let items = cart
            .lines()
            .iter()
            .map(|line| {
                Ok(CartItemView {
                    product_id: line.product.product_id.clone(),
                    name: line.product.name.clone(),
                    price: line.product.unit_price,
                    image: line.product.image.clone(),
                    category: line.product.category.clone(),
                    quantity: line.quantity,
                    line_total: line.line_total()?,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        Ok(Self {
            user_id: cart.user_id().clone(),
            items,
            subtotal: cart.subtotal()?,
            version: cart.version(),
        })
    }
}

/// A point-in-time copy of a cart, taken at checkout.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Cart owner.
    pub user_id: UserId,
    /// Stream version the snapshot was taken at.
    pub version: i64,
    /// Entries at snapshot time.
    pub lines: Vec<CartLine>,
    /// Σ line totals at snapshot time.
    pub subtotal: Money,
    /// Checkouts started but not yet settled or abandoned, oldest first.
    pub pending_checkouts: Vec<PendingCheckout>,
}

impl CartSnapshot {
    /// Returns `true` if the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Returns a user's cart. Unknown users get an empty cart at version 0.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if the stream cannot be read or decoded.
pub async fn get_cart(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<CartView, DomainError> {
    let cart = load_cart(user_id, repo).await?;
    CartView::from_cart(&cart)
}

/// Takes a consistent snapshot of a user's cart for checkout.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if the stream cannot be read or decoded,
/// and `DomainError::Validation` if the subtotal overflows.
pub async fn snapshot_cart(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<CartSnapshot, DomainError> {
    let cart = load_cart(user_id, repo).await?;
    Ok(CartSnapshot {
        user_id: user_id.clone(),
        version: cart.version(),
        subtotal: cart.subtotal()?,
        lines: cart.lines().to_vec(),
        pending_checkouts: cart.pending_checkouts().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use storefront_core::event::{DomainEvent, EventMetadata};
    use storefront_core::locks::KeyedLocks;
    use storefront_event_store::memory_event_repository::InMemoryEventRepository;
    use storefront_test_support::{
        EmptyEventRepository, FailingEventRepository, FixedClock, RecordingEventRepository,
        fixed_now, product, user,
    };
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::handle_add_item;
    use crate::domain::aggregates::cart_id;
    use crate::domain::commands::AddItem;
    use crate::domain::events::{CartEvent, CartEventKind, ITEM_ADDED_EVENT_TYPE, ItemAdded};

    #[tokio::test]
    async fn test_get_cart_for_unknown_user_is_empty() {
        let view = get_cart(&user("nobody"), &EmptyEventRepository)
            .await
            .unwrap();

        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, Money::ZERO);
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn test_get_cart_reconstitutes_stored_events() {
        // Arrange
        let alice = user("alice");
        let events: Vec<_> = [("p1", 500, 2, 1), ("p2", 1500, 1, 2)]
            .into_iter()
            .map(|(id, price, quantity, sequence)| {
                CartEvent {
                    metadata: EventMetadata::new(
                        ITEM_ADDED_EVENT_TYPE,
                        cart_id(&alice),
                        sequence,
                        Uuid::new_v4(),
                        fixed_now(),
                    ),
                    kind: CartEventKind::ItemAdded(ItemAdded {
                        user_id: alice.clone(),
                        product: product(id, price),
                        quantity,
                    }),
                }
                .to_stored()
            })
            .collect();
        let repo = RecordingEventRepository::new(events);

        // Act
        let view = get_cart(&alice, &repo).await.unwrap();

        // Assert
        assert_eq!(view.version, 2);
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].product_id.as_str(), "p1");
        assert_eq!(view.items[0].line_total.minor_units(), 1000);
        assert_eq!(view.subtotal.minor_units(), 2500);
    }

    #[tokio::test]
    async fn test_snapshot_cart_captures_lines_and_subtotal() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let locks = KeyedLocks::new();
        for (id, price, quantity) in [("p1", 500, 2), ("p2", 1500, 1)] {
            let command = AddItem {
                correlation_id: Uuid::new_v4(),
                user_id: user("alice"),
                product: product(id, price),
                quantity,
            };
            handle_add_item(&command, &clock, &repo, &locks)
                .await
                .unwrap();
        }

        // Act
        let snapshot = snapshot_cart(&user("alice"), &repo).await.unwrap();

        // Assert
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.subtotal.minor_units(), 2500);
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].quantity, 2);
        assert_eq!(snapshot.lines[1].product.product_id.as_str(), "p2");
        assert!(snapshot.pending_checkouts.is_empty());
    }

    #[tokio::test]
    async fn test_get_cart_serializes_camel_case() {
        let clock = FixedClock(fixed_now());
        let repo = InMemoryEventRepository::new();
        let locks = KeyedLocks::new();
        let command = AddItem {
            correlation_id: Uuid::new_v4(),
            user_id: user("alice"),
            product: product("p1", 500),
            quantity: 2,
        };
        handle_add_item(&command, &clock, &repo, &locks)
            .await
            .unwrap();

        let json = serde_json::to_value(get_cart(&user("alice"), &repo).await.unwrap()).unwrap();

        assert_eq!(json["userId"], "alice");
        assert_eq!(json["items"][0]["productId"], "p1");
        assert_eq!(json["items"][0]["lineTotal"], 1000);
        assert_eq!(json["subtotal"], 1000);
    }

    #[tokio::test]
    async fn test_get_cart_surfaces_upstream_error() {
        let result = get_cart(&user("alice"), &FailingEventRepository).await;

        assert!(matches!(result, Err(DomainError::Upstream(_))));
    }
}
