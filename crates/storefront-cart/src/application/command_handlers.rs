//! Command handlers for the Cart Ledger context.
//!
//! Each handler serializes on the owner's cart lock, loads the cart, runs
//! the domain method and appends the resulting events. An append that loses
//! an optimistic-concurrency race re-reads the stream and tries again.

use storefront_core::aggregate::{AggregateRoot, decode_payload};
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::event::EventMetadata;
use storefront_core::identity::UserId;
use storefront_core::locks::KeyedLocks;
use storefront_core::repository::{EventRepository, MAX_APPEND_ATTEMPTS, StoredEvent};
use tracing::{debug, warn};

use crate::application::query_handlers::CartView;
use crate::domain::aggregates::{Cart, cart_id};
use crate::domain::commands::{
    AbandonCheckout, AddItem, BeginCheckout, RemoveItem, SetQuantity, SettleCheckout,
};
use crate::domain::events::{CartEvent, CartEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct CartCommandResult {
    /// The cart after the command.
    pub cart: CartView,
    /// The stored events produced and persisted. Empty for no-op commands.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `Cart` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if event deserialization fails.
pub(crate) fn reconstitute(
    user_id: &UserId,
    existing_events: &[StoredEvent],
) -> Result<Cart, DomainError> {
    let mut cart = Cart::new(user_id.clone());
    for stored in existing_events {
        let kind: CartEventKind = decode_payload(stored)?;
        let event = CartEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        };
        cart.apply(&event);
    }
    Ok(cart)
}

/// Loads the current state of a user's cart. Unknown users get an empty cart.
///
/// # Errors
///
/// Returns `DomainError` if loading or deserialization fails.
pub(crate) async fn load_cart(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<Cart, DomainError> {
    let existing_events = repo.load_events(cart_id(user_id)).await?;
    reconstitute(user_id, &existing_events)
}

/// Key under which same-user cart mutations are serialized.
#[must_use]
pub fn cart_lock_key(user_id: &UserId) -> String {
    format!("cart:{user_id}")
}

async fn execute<F>(
    user_id: &UserId,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
    mut decide: F,
) -> Result<CartCommandResult, DomainError>
where
    F: FnMut(&mut Cart) -> Result<(), DomainError> + Send,
{
    let _guard = locks.lock(&cart_lock_key(user_id)).await;
    let mut attempt = 1;
    loop {
        let mut cart = load_cart(user_id, repo).await?;
        decide(&mut cart)?;

        let stored_events = cart.pending_stored_events();
        if stored_events.is_empty() {
            debug!(user_id = %user_id, "cart command changed nothing");
            return Ok(CartCommandResult {
                cart: CartView::from_cart(&cart)?,
                stored_events,
            });
        }

        match repo
            .append_events(cart.id, cart.version(), &stored_events)
            .await
        {
            Ok(()) => {
                cart.clear_uncommitted_events();
                return Ok(CartCommandResult {
                    cart: CartView::from_cart(&cart)?,
                    stored_events,
                });
            }
            Err(DomainError::ConcurrencyConflict { expected, actual, .. })
                if attempt < MAX_APPEND_ATTEMPTS =>
            {
                warn!(
                    user_id = %user_id,
                    attempt,
                    expected,
                    actual,
                    "cart append lost a race, retrying"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Handles the `AddItem` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a zero quantity or an overflowing
/// total, and any error from loading or appending events.
pub async fn handle_add_item(
    command: &AddItem,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.add_item(
            command.product.clone(),
            command.quantity,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `SetQuantity` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` when a positive quantity targets a
/// product the cart does not hold, and any error from loading or appending.
pub async fn handle_set_quantity(
    command: &SetQuantity,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.set_quantity(
            &command.product_id,
            command.quantity,
            command.correlation_id,
            clock,
        )
    })
    .await
}

/// Handles the `RemoveItem` command. Removing an absent product succeeds
/// without recording anything.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_remove_item(
    command: &RemoveItem,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.remove_item(&command.product_id, command.correlation_id, clock);
        Ok(())
    })
    .await
}

/// Handles the `BeginCheckout` command. Beginning a checkout that is
/// already pending or settled succeeds without recording anything.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_begin_checkout(
    command: &BeginCheckout,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.begin_checkout(
            command.order_id,
            command.cart_version,
            command.correlation_id,
            clock,
        );
        Ok(())
    })
    .await
}

/// Handles the `SettleCheckout` command.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_settle_checkout(
    command: &SettleCheckout,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.settle_checkout(
            command.order_id,
            command.cart_version,
            &command.lines,
            command.correlation_id,
            clock,
        );
        Ok(())
    })
    .await
}

/// Handles the `AbandonCheckout` command.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_abandon_checkout(
    command: &AbandonCheckout,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<CartCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |cart| {
        cart.abandon_checkout(command.order_id, command.correlation_id, clock);
        Ok(())
    })
    .await
}
