//! Command handlers for the Wishlist Ledger context.

use storefront_core::aggregate::{AggregateRoot, decode_payload};
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::event::EventMetadata;
use storefront_core::identity::UserId;
use storefront_core::locks::KeyedLocks;
use storefront_core::repository::{EventRepository, MAX_APPEND_ATTEMPTS, StoredEvent};
use tracing::warn;

use crate::application::query_handlers::WishlistView;
use crate::domain::aggregates::{Wishlist, wishlist_id};
use crate::domain::commands::{AddToWishlist, RemoveFromWishlist};
use crate::domain::events::{WishlistEvent, WishlistEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct WishlistCommandResult {
    /// The wishlist after the command.
    pub wishlist: WishlistView,
    /// The stored events produced and persisted. Empty for no-op commands.
    pub stored_events: Vec<StoredEvent>,
}

pub(crate) fn reconstitute(
    user_id: &UserId,
    existing_events: &[StoredEvent],
) -> Result<Wishlist, DomainError> {
    let mut wishlist = Wishlist::new(user_id.clone());
    for stored in existing_events {
        let kind: WishlistEventKind = decode_payload(stored)?;
        wishlist.apply(&WishlistEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        });
    }
    Ok(wishlist)
}

pub(crate) async fn load_wishlist(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<Wishlist, DomainError> {
    let existing_events = repo.load_events(wishlist_id(user_id)).await?;
    reconstitute(user_id, &existing_events)
}

/// Key under which same-user wishlist mutations are serialized.
#[must_use]
pub fn wishlist_lock_key(user_id: &UserId) -> String {
    format!("wishlist:{user_id}")
}

async fn execute<F>(
    user_id: &UserId,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
    mut decide: F,
) -> Result<WishlistCommandResult, DomainError>
where
    F: FnMut(&mut Wishlist) + Send,
{
    let _guard = locks.lock(&wishlist_lock_key(user_id)).await;
    let mut attempt = 1;
    loop {
        let mut wishlist = load_wishlist(user_id, repo).await?;
        decide(&mut wishlist);

        let stored_events = wishlist.pending_stored_events();
        if !stored_events.is_empty() {
            match repo
                .append_events(wishlist.id, wishlist.version(), &stored_events)
                .await
            {
                Ok(()) => wishlist.clear_uncommitted_events(),
                Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
                    warn!(user_id = %user_id, attempt, "wishlist append lost a race, retrying");
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        return Ok(WishlistCommandResult {
            wishlist: WishlistView::from_wishlist(&wishlist),
            stored_events,
        });
    }
}

/// Handles the `AddToWishlist` command.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_add_to_wishlist(
    command: &AddToWishlist,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<WishlistCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |wishlist| {
        wishlist.save(command.product.clone(), command.correlation_id, clock);
    })
    .await
}

/// Handles the `RemoveFromWishlist` command.
///
/// # Errors
///
/// Returns `DomainError` if event loading or appending fails.
pub async fn handle_remove_from_wishlist(
    command: &RemoveFromWishlist,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    locks: &KeyedLocks,
) -> Result<WishlistCommandResult, DomainError> {
    execute(&command.user_id, repo, locks, |wishlist| {
        wishlist.unsave(&command.product_id, command.correlation_id, clock);
    })
    .await
}
