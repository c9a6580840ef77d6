//! Shared application state.

use std::sync::Arc;

use storefront_catalog::store::CatalogStore;
use storefront_checkout::coordinator::CheckoutDeps;
use storefront_checkout::retry::RetryPolicy;
use storefront_core::clock::Clock;
use storefront_core::locks::KeyedLocks;
use storefront_core::repository::EventRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Event repository for persisting and loading domain events.
    pub event_repository: Arc<dyn EventRepository>,
    /// Read-only product catalog.
    pub catalog: Arc<dyn CatalogStore>,
    /// Per-user cart locks.
    pub cart_locks: Arc<KeyedLocks>,
    /// Per-user wishlist locks.
    pub wishlist_locks: Arc<KeyedLocks>,
    /// Per-user checkout tokens.
    pub checkout_tokens: Arc<KeyedLocks>,
    /// Backoff for checkout reads.
    pub checkout_retry: RetryPolicy,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("checkout_retry", &self.checkout_retry)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state with empty lock registries.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        catalog: Arc<dyn CatalogStore>,
        checkout_retry: RetryPolicy,
    ) -> Self {
        Self {
            clock,
            event_repository,
            catalog,
            cart_locks: Arc::new(KeyedLocks::new()),
            wishlist_locks: Arc::new(KeyedLocks::new()),
            checkout_tokens: Arc::new(KeyedLocks::new()),
            checkout_retry,
        }
    }

    /// Borrows the collaborators a checkout runs against.
    #[must_use]
    pub fn checkout_deps(&self) -> CheckoutDeps<'_> {
        CheckoutDeps {
            clock: self.clock.as_ref(),
            repo: self.event_repository.as_ref(),
            cart_locks: &self.cart_locks,
            checkout_tokens: &self.checkout_tokens,
            retry: &self.checkout_retry,
        }
    }
}
