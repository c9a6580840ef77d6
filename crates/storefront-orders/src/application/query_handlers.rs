//! Query handlers for the Order Ledger context.
//!
//! Orders are visible only to the user that placed them; any other requester
//! is told the order does not exist.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storefront_core::aggregate::AggregateRoot;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;
use storefront_core::money::Money;
use storefront_core::repository::EventRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::command_handlers::{load_history, load_order};
use crate::domain::address::ShippingAddress;
use crate::domain::aggregates::{Order, OrderLine};
use crate::domain::status::OrderStatus;

/// Read-only view of an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    /// The order identifier.
    pub order_id: Uuid,
    /// The purchasing user.
    pub user_id: UserId,
    /// The client idempotency key the id was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Cart stream version the order's snapshot was taken at.
    pub cart_version: i64,
    /// Purchased lines, frozen at placement.
    pub items: Vec<OrderLine>,
    /// Σ line totals.
    pub total: Money,
    /// Where the order ships to.
    pub address: ShippingAddress,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Placement time.
    pub created_at: DateTime<Utc>,
    /// Stream version the view was built from.
    pub version: i64,
}

impl OrderView {
    pub(crate) fn from_order(order: &Order) -> Result<Self, DomainError> {
        let placement = order
            .placement()
            .ok_or_else(|| DomainError::NotFound(format!("order {}", order.id)))?;
        Ok(Self {
            order_id: order.id,
            user_id: placement.user_id.clone(),
            idempotency_key: placement.idempotency_key.clone(),
            cart_version: placement.cart_version,
            items: placement.lines.clone(),
            total: placement.total,
            address: placement.address.clone(),
            status: order.status(),
            created_at: placement.placed_at,
            version: order.version(),
        })
    }
}

/// Returns an order visible to `requester`, or `None`.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if the stream cannot be read or decoded.
pub async fn find_order(
    requester: &UserId,
    order_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Option<OrderView>, DomainError> {
    let order = load_order(order_id, repo).await?;
    if !order.is_owned_by(requester) {
        return Ok(None);
    }
    OrderView::from_order(&order).map(Some)
}

/// Returns an order placed by `requester`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist or belongs to
/// another user, and `DomainError::Upstream` if the stream cannot be read.
pub async fn get_order(
    requester: &UserId,
    order_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<OrderView, DomainError> {
    find_order(requester, order_id, repo)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("order {order_id}")))
}

/// Lists a user's orders, most recent first. Orders placed at the same
/// instant are listed most recently recorded first. History entries whose
/// order was never placed are skipped.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if a stream cannot be read or decoded.
pub async fn list_orders(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<Vec<OrderView>, DomainError> {
    let history = load_history(user_id, repo).await?;
    let mut orders = Vec::with_capacity(history.entries().len());
    for (position, entry) in history.entries().iter().enumerate() {
        let order = load_order(entry.order_id, repo).await?;
        if !order.is_placed() {
            debug!(order_id = %entry.order_id, user_id = %user_id, "recorded order was never placed");
            continue;
        }
        if !order.is_owned_by(user_id) {
            warn!(order_id = %entry.order_id, user_id = %user_id, "history entry names a foreign order");
            continue;
        }
        orders.push((position, OrderView::from_order(&order)?));
    }
    orders.sort_by_key(|(position, view)| Reverse((view.created_at, *position)));
    Ok(orders.into_iter().map(|(_, view)| view).collect())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use storefront_test_support::{EmptyEventRepository, FixedClock, fixed_now, product, user};
    use storefront_event_store::memory_event_repository::InMemoryEventRepository;

    use super::*;
    use crate::application::command_handlers::{handle_place_order, handle_record_order};
    use crate::domain::aggregates::OrderItem;
    use crate::domain::commands::{PlaceOrder, RecordOrder};

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_owned(),
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            region: None,
            postal_code: "62701".to_owned(),
            country: "US".to_owned(),
            phone: None,
        }
    }

    async fn place_and_record(
        repo: &InMemoryEventRepository,
        user_id: &str,
        key: &str,
        at: DateTime<Utc>,
    ) -> Uuid {
        let clock = FixedClock(at);
        let placed = handle_place_order(
            &PlaceOrder {
                correlation_id: Uuid::new_v4(),
                user_id: user(user_id),
                idempotency_key: Some(key.to_owned()),
                cart_version: 1,
                items: vec![OrderItem {
                    product: product("p1", 500),
                    quantity: 1,
                }],
                address: address(),
            },
            &clock,
            repo,
        )
        .await
        .unwrap();
        handle_record_order(
            &RecordOrder {
                correlation_id: Uuid::new_v4(),
                user_id: user(user_id),
                order_id: placed.order.order_id,
                recorded_at: placed.order.created_at,
            },
            &clock,
            repo,
        )
        .await
        .unwrap();
        placed.order.order_id
    }

    #[tokio::test]
    async fn test_get_order_returns_owned_order() {
        let repo = InMemoryEventRepository::new();
        let id = place_and_record(&repo, "alice", "k1", fixed_now()).await;

        let view = get_order(&user("alice"), id, &repo).await.unwrap();

        assert_eq!(view.order_id, id);
        assert_eq!(view.total.minor_units(), 500);
        assert_eq!(view.created_at, fixed_now());
    }

    #[tokio::test]
    async fn test_get_order_hides_foreign_order() {
        let repo = InMemoryEventRepository::new();
        let id = place_and_record(&repo, "alice", "k1", fixed_now()).await;

        let result = get_order(&user("mallory"), id, &repo).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_order_unknown_id_is_not_found() {
        let result = get_order(&user("alice"), Uuid::new_v4(), &EmptyEventRepository).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_is_newest_first_with_recording_tiebreak() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let oldest = place_and_record(&repo, "alice", "k1", fixed_now()).await;
        let newest = place_and_record(&repo, "alice", "k2", fixed_now() + Duration::hours(1)).await;
        let tied = place_and_record(&repo, "alice", "k3", fixed_now()).await;
        place_and_record(&repo, "bob", "k1", fixed_now()).await;

        // Act
        let orders = list_orders(&user("alice"), &repo).await.unwrap();

        // Assert
        let ids: Vec<Uuid> = orders.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![newest, tied, oldest]);
    }

    #[tokio::test]
    async fn test_list_orders_skips_recorded_but_unplaced_orders() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let placed = place_and_record(&repo, "alice", "k1", fixed_now()).await;
        handle_record_order(
            &RecordOrder {
                correlation_id: Uuid::new_v4(),
                user_id: user("alice"),
                order_id: Uuid::new_v4(),
                recorded_at: fixed_now(),
            },
            &FixedClock(fixed_now()),
            &repo,
        )
        .await
        .unwrap();

        // Act
        let orders = list_orders(&user("alice"), &repo).await.unwrap();

        // Assert
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, placed);
    }

    #[tokio::test]
    async fn test_list_orders_for_unknown_user_is_empty() {
        let orders = list_orders(&user("nobody"), &EmptyEventRepository)
            .await
            .unwrap();

        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_order_view_serializes_camel_case() {
        let repo = InMemoryEventRepository::new();
        let id = place_and_record(&repo, "alice", "k1", fixed_now()).await;

        let json = serde_json::to_value(get_order(&user("alice"), id, &repo).await.unwrap()).unwrap();

        assert_eq!(json["orderId"], id.to_string());
        assert_eq!(json["status"], "placed");
        assert_eq!(json["items"][0]["lineTotal"], 500);
        assert_eq!(json["address"]["postalCode"], "62701");
    }
}
