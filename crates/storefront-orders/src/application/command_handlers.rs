//! Command handlers for the Order Ledger context.
//!
//! Order placement is keyed by a deterministic order id, so a retried
//! placement finds the existing stream instead of creating a second order.
//! Placement is never retried on upstream failure; the caller decides.

use storefront_core::aggregate::{AggregateRoot, decode_payload};
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::event::EventMetadata;
use storefront_core::identity::UserId;
use storefront_core::repository::{EventRepository, MAX_APPEND_ATTEMPTS, StoredEvent};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::query_handlers::OrderView;
use crate::domain::aggregates::{
    Order, OrderHistory, checkout_order_id, order_history_id, validate_idempotency_key,
};
use crate::domain::commands::{AdvanceStatus, PlaceOrder, RecordOrder};
use crate::domain::events::{OrderEvent, OrderEventKind, OrderHistoryEvent, OrderHistoryEventKind};

/// Result of a successfully handled order command.
#[derive(Debug)]
pub struct OrderCommandResult {
    /// The order after the command.
    pub order: OrderView,
    /// `true` when placement found the order already created.
    pub replayed: bool,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Result of recording an order in its owner's history.
#[derive(Debug)]
pub struct HistoryCommandResult {
    /// The history stream affected.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted. Empty when the order was
    /// already recorded.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes an `Order` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if event deserialization fails.
pub(crate) fn reconstitute(
    order_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Order, DomainError> {
    let mut order = Order::new(order_id);
    for stored in existing_events {
        let kind: OrderEventKind = decode_payload(stored)?;
        order.apply(&OrderEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(order)
}

/// Reconstitutes an `OrderHistory` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if event deserialization fails.
pub(crate) fn reconstitute_history(
    user_id: &UserId,
    existing_events: &[StoredEvent],
) -> Result<OrderHistory, DomainError> {
    let mut history = OrderHistory::new(user_id);
    for stored in existing_events {
        let kind: OrderHistoryEventKind = decode_payload(stored)?;
        history.apply(&OrderHistoryEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(history)
}

pub(crate) async fn load_order(
    order_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Order, DomainError> {
    let existing_events = repo.load_events(order_id).await?;
    reconstitute(order_id, &existing_events)
}

pub(crate) async fn load_history(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<OrderHistory, DomainError> {
    let existing_events = repo.load_events(order_history_id(user_id)).await?;
    reconstitute_history(user_id, &existing_events)
}

fn replay(order: &Order) -> Result<OrderCommandResult, DomainError> {
    Ok(OrderCommandResult {
        order: OrderView::from_order(order)?,
        replayed: true,
        stored_events: Vec::new(),
    })
}

/// Handles the `PlaceOrder` command.
///
/// The order id is derived from the user and the client key, or from the
/// cart version when no key was sent. If that order already exists, it is
/// returned unchanged with `replayed` set.
///
/// # Errors
///
/// Returns `DomainError::EmptyCart` for an empty item list,
/// `DomainError::Validation` for bad input, and any error from loading or
/// appending events.
pub async fn handle_place_order(
    command: &PlaceOrder,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<OrderCommandResult, DomainError> {
    let key = command
        .idempotency_key
        .as_deref()
        .map(validate_idempotency_key)
        .transpose()?;
    let id = checkout_order_id(&command.user_id, key.as_deref(), command.cart_version);

    let mut order = load_order(id, repo).await?;
    if order.is_placed() {
        info!(order_id = %id, user_id = %command.user_id, "order already placed, replaying");
        return replay(&order);
    }

    order.place(
        command.user_id.clone(),
        key.as_deref(),
        command.cart_version,
        &command.items,
        &command.address,
        command.correlation_id,
        clock,
    )?;
    let stored_events = order.pending_stored_events();

    match repo
        .append_events(id, order.version(), &stored_events)
        .await
    {
        Ok(()) => {
            order.clear_uncommitted_events();
            info!(
                order_id = %id,
                user_id = %command.user_id,
                correlation_id = %command.correlation_id,
                "order placed"
            );
            Ok(OrderCommandResult {
                order: OrderView::from_order(&order)?,
                replayed: false,
                stored_events,
            })
        }
        Err(DomainError::ConcurrencyConflict { .. }) => {
            // A concurrent attempt with the same key won the race.
            let existing = load_order(id, repo).await?;
            if existing.is_placed() {
                replay(&existing)
            } else {
                Err(DomainError::Conflict(format!(
                    "order {id} is being placed concurrently"
                )))
            }
        }
        Err(e) => Err(e),
    }
}

/// Handles the `RecordOrder` command. Recording an order twice succeeds
/// without appending anything.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_record_order(
    command: &RecordOrder,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<HistoryCommandResult, DomainError> {
    let mut attempt = 1;
    loop {
        let mut history = load_history(&command.user_id, repo).await?;
        history.record_order(
            command.order_id,
            command.recorded_at,
            command.correlation_id,
            clock,
        );
        let stored_events = history.pending_stored_events();
        if stored_events.is_empty() {
            return Ok(HistoryCommandResult {
                aggregate_id: history.id,
                stored_events,
            });
        }

        match repo
            .append_events(history.id, history.version(), &stored_events)
            .await
        {
            Ok(()) => {
                return Ok(HistoryCommandResult {
                    aggregate_id: history.id,
                    stored_events,
                });
            }
            Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
                warn!(user_id = %command.user_id, attempt, "order history append lost a race, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Handles the `AdvanceStatus` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist or belongs to
/// another user, `DomainError::InvalidTransition` if the lifecycle forbids the
/// move, and any error from loading or appending events.
pub async fn handle_advance_status(
    command: &AdvanceStatus,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<OrderCommandResult, DomainError> {
    let mut attempt = 1;
    loop {
        let mut order = load_order(command.order_id, repo).await?;
        if !order.is_owned_by(&command.user_id) {
            return Err(DomainError::NotFound(format!("order {}", command.order_id)));
        }
        order.advance_status(command.next, command.correlation_id, clock)?;
        let stored_events = order.pending_stored_events();

        match repo
            .append_events(order.id, order.version(), &stored_events)
            .await
        {
            Ok(()) => {
                order.clear_uncommitted_events();
                info!(
                    order_id = %order.id,
                    status = %order.status(),
                    correlation_id = %command.correlation_id,
                    "order status advanced"
                );
                return Ok(OrderCommandResult {
                    order: OrderView::from_order(&order)?,
                    replayed: false,
                    stored_events,
                });
            }
            Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
                warn!(order_id = %order.id, attempt, "order append lost a race, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
