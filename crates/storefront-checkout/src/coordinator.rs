//! Checkout orchestration: snapshot the cart, create the order, clear the
//! purchased lines.
//!
//! The order id is derived from the user and an idempotency key, or from the
//! snapshot's cart version when the client sent none. Before the order is
//! placed, the cart is marked with a pending checkout and the order is
//! entered in the user's history, so a later attempt can find an
//! interrupted checkout whatever key it carries and finish it instead of
//! ordering the same lines twice. A second attempt by the same user while
//! one is in flight is turned away rather than queued.

use storefront_cart::application::command_handlers::{
    handle_abandon_checkout, handle_begin_checkout, handle_settle_checkout,
};
use storefront_cart::application::query_handlers::{CartSnapshot, snapshot_cart};
use storefront_cart::domain::aggregates::PendingCheckout;
use storefront_cart::domain::commands::{AbandonCheckout, BeginCheckout, SettleCheckout};
use storefront_cart::domain::events::SettledLine;
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;
use storefront_core::locks::KeyedLocks;
use storefront_core::repository::EventRepository;
use storefront_orders::application::command_handlers::{handle_place_order, handle_record_order};
use storefront_orders::application::query_handlers::{OrderView, find_order};
use storefront_orders::domain::address::ShippingAddress;
use storefront_orders::domain::aggregates::{
    OrderItem, checkout_order_id, order_id, validate_idempotency_key,
};
use storefront_orders::domain::commands::{PlaceOrder, RecordOrder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::phase::CheckoutPhase;
use crate::retry::RetryPolicy;

/// A request to check out a user's cart.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The purchasing user.
    pub user_id: UserId,
    /// Where the order ships to.
    pub address: ShippingAddress,
    /// Client-supplied idempotency key. When absent, the order id is derived
    /// from the cart version the snapshot was taken at.
    pub idempotency_key: Option<String>,
}

/// Result of a completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The order the cart became.
    pub order: OrderView,
    /// `true` when the order already existed and this attempt only finished
    /// the remaining steps.
    pub replayed: bool,
    /// The phase reached; always `Done` for a returned outcome.
    pub phase: CheckoutPhase,
}

/// Collaborators a checkout runs against.
#[derive(Clone, Copy)]
pub struct CheckoutDeps<'a> {
    pub clock: &'a dyn Clock,
    pub repo: &'a dyn EventRepository,
    /// Per-user cart locks shared with the cart command handlers.
    pub cart_locks: &'a KeyedLocks,
    /// Per-user checkout tokens.
    pub checkout_tokens: &'a KeyedLocks,
    pub retry: &'a RetryPolicy,
}

impl std::fmt::Debug for CheckoutDeps<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutDeps")
            .field("retry", self.retry)
            .finish_non_exhaustive()
    }
}

/// Key of the per-user checkout token.
#[must_use]
pub fn checkout_token_key(user_id: &UserId) -> String {
    format!("checkout:{user_id}")
}

struct Attempt<'a> {
    request: &'a Checkout,
    deps: CheckoutDeps<'a>,
    phase: CheckoutPhase,
}

impl Attempt<'_> {
    fn advance(&mut self, phase: CheckoutPhase) {
        self.phase = phase;
        info!(
            user_id = %self.request.user_id,
            correlation_id = %self.request.correlation_id,
            phase = %phase,
            "checkout phase"
        );
    }

    async fn find(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let user_id = &self.request.user_id;
        let repo = self.deps.repo;
        self.deps
            .retry
            .run("find order", || find_order(user_id, id, repo))
            .await
    }

    async fn snapshot(&self) -> Result<CartSnapshot, DomainError> {
        let user_id = &self.request.user_id;
        let repo = self.deps.repo;
        self.deps
            .retry
            .run("snapshot cart", || snapshot_cart(user_id, repo))
            .await
    }

    async fn run(
        &mut self,
        address: &ShippingAddress,
        explicit_key: Option<String>,
    ) -> Result<CheckoutOutcome, DomainError> {
        let request = self.request;
        let deps = self.deps;
        let user_id = &request.user_id;

        if let Some(key) = &explicit_key {
            let id = order_id(user_id, key);
            if let Some(order) = self.find(id).await? {
                info!(order_id = %id, user_id = %user_id, "checkout key already used, resuming");
                self.advance(CheckoutPhase::OrderCreated);
                return self.finish(order, true).await;
            }
        }

        let mut snapshot = self.snapshot().await?;
        if !snapshot.pending_checkouts.is_empty() {
            let mut interrupted = self.reconcile(&snapshot.pending_checkouts).await?;
            if explicit_key.is_none()
                && let Some(order) = interrupted.pop()
            {
                for earlier in &interrupted {
                    self.complete(earlier).await?;
                }
                self.advance(CheckoutPhase::OrderCreated);
                return self.finish(order, true).await;
            }
            for order in &interrupted {
                self.complete(order).await?;
            }
            snapshot = self.snapshot().await?;
        }
        if snapshot.is_empty() {
            return Err(DomainError::EmptyCart(user_id.to_string()));
        }
        self.advance(CheckoutPhase::Snapshotted);

        let id = checkout_order_id(user_id, explicit_key.as_deref(), snapshot.version);
        handle_begin_checkout(
            &BeginCheckout {
                correlation_id: request.correlation_id,
                user_id: user_id.clone(),
                order_id: id,
                cart_version: snapshot.version,
            },
            deps.clock,
            deps.repo,
            deps.cart_locks,
        )
        .await?;
        handle_record_order(
            &RecordOrder {
                correlation_id: request.correlation_id,
                user_id: user_id.clone(),
                order_id: id,
                recorded_at: deps.clock.now(),
            },
            deps.clock,
            deps.repo,
        )
        .await?;

        let placed = handle_place_order(
            &PlaceOrder {
                correlation_id: request.correlation_id,
                user_id: user_id.clone(),
                idempotency_key: explicit_key,
                cart_version: snapshot.version,
                items: snapshot
                    .lines
                    .iter()
                    .map(|line| OrderItem {
                        product: line.product.clone(),
                        quantity: line.quantity,
                    })
                    .collect(),
                address: address.clone(),
            },
            deps.clock,
            deps.repo,
        )
        .await?;
        self.advance(CheckoutPhase::OrderCreated);

        self.finish(placed.order, placed.replayed).await
    }

    /// Sorts pending checkouts into interrupted ones, whose order exists and
    /// is returned oldest first, and ones that never got an order, which are
    /// abandoned.
    async fn reconcile(
        &self,
        pending: &[PendingCheckout],
    ) -> Result<Vec<OrderView>, DomainError> {
        let request = self.request;
        let deps = self.deps;
        let mut interrupted = Vec::new();
        for checkout in pending {
            if let Some(order) = self.find(checkout.order_id).await? {
                info!(
                    order_id = %checkout.order_id,
                    user_id = %request.user_id,
                    "found interrupted checkout"
                );
                interrupted.push(order);
                continue;
            }
            warn!(
                order_id = %checkout.order_id,
                user_id = %request.user_id,
                "abandoning checkout that never placed its order"
            );
            handle_abandon_checkout(
                &AbandonCheckout {
                    correlation_id: request.correlation_id,
                    user_id: request.user_id.clone(),
                    order_id: checkout.order_id,
                },
                deps.clock,
                deps.repo,
                deps.cart_locks,
            )
            .await?;
        }
        Ok(interrupted)
    }

    /// Records `order` in the history and removes its lines from the cart.
    /// Both steps are no-ops when already done.
    async fn complete(&self, order: &OrderView) -> Result<(), DomainError> {
        let request = self.request;
        let deps = self.deps;

        handle_record_order(
            &RecordOrder {
                correlation_id: request.correlation_id,
                user_id: request.user_id.clone(),
                order_id: order.order_id,
                recorded_at: deps.clock.now(),
            },
            deps.clock,
            deps.repo,
        )
        .await?;

        let lines = order
            .items
            .iter()
            .map(|line| SettledLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            })
            .collect();
        handle_settle_checkout(
            &SettleCheckout {
                correlation_id: request.correlation_id,
                user_id: request.user_id.clone(),
                order_id: order.order_id,
                cart_version: order.cart_version,
                lines,
            },
            deps.clock,
            deps.repo,
            deps.cart_locks,
        )
        .await?;
        Ok(())
    }

    async fn finish(
        &mut self,
        order: OrderView,
        replayed: bool,
    ) -> Result<CheckoutOutcome, DomainError> {
        self.complete(&order).await?;
        self.advance(CheckoutPhase::CartCleared);

        self.advance(CheckoutPhase::Done);
        Ok(CheckoutOutcome {
            order,
            replayed,
            phase: CheckoutPhase::Done,
        })
    }
}

/// Checks out a user's cart.
///
/// An interrupted checkout of the same user is finished first: without a
/// client key its order is returned as a replay; with a different key it is
/// completed and the cart's remaining lines are checked out.
///
/// # Errors
///
/// - `DomainError::Validation` for an incomplete address or a bad key.
/// - `DomainError::Conflict` if the user already has a checkout in flight.
/// - `DomainError::EmptyCart` if the snapshot has no entries; nothing is
///   written.
/// - `DomainError::Upstream` if a store fails. Retrying completes an order
///   that was already created.
pub async fn handle_checkout(
    request: &Checkout,
    deps: CheckoutDeps<'_>,
) -> Result<CheckoutOutcome, DomainError> {
    let address = request.address.normalized()?;
    let explicit_key = request
        .idempotency_key
        .as_deref()
        .map(validate_idempotency_key)
        .transpose()?;

    let Some(_token) = deps
        .checkout_tokens
        .try_lock(&checkout_token_key(&request.user_id))
    else {
        return Err(DomainError::Conflict(format!(
            "a checkout for user {} is already in progress",
            request.user_id
        )));
    };

    let mut attempt = Attempt {
        request,
        deps,
        phase: CheckoutPhase::Started,
    };
    attempt.advance(CheckoutPhase::Started);

    match attempt.run(&address, explicit_key).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            warn!(
                user_id = %request.user_id,
                correlation_id = %request.correlation_id,
                reached = %attempt.phase,
                order_exists = attempt.phase.has_order(),
                phase = %CheckoutPhase::Failed,
                error = %e,
                "checkout failed"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use storefront_cart::application::command_handlers::{handle_add_item, handle_remove_item};
    use storefront_cart::application::query_handlers::get_cart;
    use storefront_cart::domain::commands::{AddItem, RemoveItem};
    use storefront_cart::domain::events::CHECKOUT_SETTLED_EVENT_TYPE;
    use storefront_core::identity::ProductId;
    use storefront_event_store::memory_event_repository::InMemoryEventRepository;
    use storefront_orders::application::query_handlers::list_orders;
    use storefront_orders::domain::aggregates::order_history_id;
    use storefront_orders::domain::events::ORDER_PLACED_EVENT_TYPE;
    use storefront_test_support::{
        FaultInjectingEventRepository, FixedClock, fixed_now, product, user,
    };

    use super::*;

    struct Harness {
        clock: FixedClock,
        repo: Arc<dyn EventRepository>,
        cart_locks: KeyedLocks,
        checkout_tokens: KeyedLocks,
        retry: RetryPolicy,
    }

    impl Harness {
        fn new(repo: Arc<dyn EventRepository>) -> Self {
            Self {
                clock: FixedClock(fixed_now()),
                repo,
                cart_locks: KeyedLocks::new(),
                checkout_tokens: KeyedLocks::new(),
                retry: RetryPolicy::new(3, Duration::from_millis(1)),
            }
        }

        fn deps(&self) -> CheckoutDeps<'_> {
            CheckoutDeps {
                clock: &self.clock,
                repo: self.repo.as_ref(),
                cart_locks: &self.cart_locks,
                checkout_tokens: &self.checkout_tokens,
                retry: &self.retry,
            }
        }

        async fn add(&self, user_id: &str, product_id: &str, price: i64, quantity: u32) {
            handle_add_item(
                &AddItem {
                    correlation_id: Uuid::new_v4(),
                    user_id: user(user_id),
                    product: product(product_id, price),
                    quantity,
                },
                &self.clock,
                self.repo.as_ref(),
                &self.cart_locks,
            )
            .await
            .unwrap();
        }

        async fn remove(&self, user_id: &str, product_id: &str) {
            handle_remove_item(
                &RemoveItem {
                    correlation_id: Uuid::new_v4(),
                    user_id: user(user_id),
                    product_id: ProductId::parse(product_id).unwrap(),
                },
                &self.clock,
                self.repo.as_ref(),
                &self.cart_locks,
            )
            .await
            .unwrap();
        }

        async fn cart_lines(&self, user_id: &str) -> Vec<(String, u32)> {
            get_cart(&user(user_id), self.repo.as_ref())
                .await
                .unwrap()
                .items
                .iter()
                .map(|item| (item.product_id.to_string(), item.quantity))
                .collect()
        }

        async fn checkout(&self, user_id: &str, key: Option<&str>) -> Result<CheckoutOutcome, DomainError> {
            handle_checkout(
                &Checkout {
                    correlation_id: Uuid::new_v4(),
                    user_id: user(user_id),
                    address: address(),
                    idempotency_key: key.map(str::to_owned),
                },
                self.deps(),
            )
            .await
        }
    }

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

    #[tokio::test]
    async fn test_checkout_prices_snapshot_and_empties_cart() {
        // Arrange
        let harness = Harness::new(Arc::new(InMemoryEventRepository::new()));
        harness.add("alice", "p1", 500, 2).await;
        harness.add("alice", "p2", 1500, 1).await;

        // Act
        let first = harness.checkout("alice", Some("k1")).await.unwrap();
        let second = harness.checkout("alice", Some("k1")).await.unwrap();

        // Assert
        assert_eq!(first.order.total.minor_units(), 2500);
        assert_eq!(first.order.items.len(), 2);
        assert_eq!(first.phase, CheckoutPhase::Done);
        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.order.order_id, first.order.order_id);

        let cart = get_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert!(cart.items.is_empty());
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_fails_without_side_effects() {
        // Arrange
        let repo = Arc::new(InMemoryEventRepository::new());
        let harness = Harness::new(repo.clone());

        // Act
        let result = harness.checkout("alice", None).await;

        // Assert
        assert!(matches!(result, Err(DomainError::EmptyCart(_))));
        assert_eq!(repo.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_uses_captured_price_not_catalog_price() {
        // Arrange: the second add carries a newer price for the same product.
        let harness = Harness::new(Arc::new(InMemoryEventRepository::new()));
        harness.add("alice", "p1", 500, 1).await;
        harness.add("alice", "p1", 9_999, 1).await;

        // Act
        let outcome = harness.checkout("alice", None).await.unwrap();

        // Assert
        assert_eq!(outcome.order.total.minor_units(), 1000);
    }

    #[tokio::test]
    async fn test_retry_after_crash_before_clear_yields_one_order() {
        // Arrange
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);

        // Act
        let crashed = harness.checkout("alice", Some("k1")).await;
        let retried = harness.checkout("alice", Some("k1")).await.unwrap();

        // Assert
        assert!(matches!(crashed, Err(DomainError::Upstream(_))));
        assert!(retried.replayed);
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, retried.order.order_id);
        let cart = get_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_retry_without_key_after_crash_finds_same_order() {
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);

        let crashed = harness.checkout("alice", None).await;
        let retried = harness.checkout("alice", None).await.unwrap();

        assert!(crashed.is_err());
        assert!(retried.replayed);
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_units_added_after_snapshot_survive_clear() {
        // Arrange: checkout crashes after creating the order, then another
        // unit of p1 and a new product arrive before the retry.
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);
        assert!(harness.checkout("alice", Some("k1")).await.is_err());
        harness.add("alice", "p1", 500, 1).await;
        harness.add("alice", "p3", 100, 1).await;

        // Act
        let outcome = harness.checkout("alice", Some("k1")).await.unwrap();

        // Assert
        assert_eq!(outcome.order.items[0].quantity, 2);
        let cart = get_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        let remaining: Vec<(&str, u32)> = cart
            .items
            .iter()
            .map(|item| (item.product_id.as_str(), item.quantity))
            .collect();
        assert_eq!(remaining, vec![("p1", 1), ("p3", 1)]);
    }

    #[tokio::test]
    async fn test_retry_after_item_removed_and_added_again_keeps_new_unit() {
        // Arrange: the order for two units of p1 exists, then the entry is
        // removed and a single fresh unit is added before the retry.
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);
        assert!(harness.checkout("alice", Some("k1")).await.is_err());
        harness.remove("alice", "p1").await;
        harness.add("alice", "p1", 500, 1).await;

        // Act
        let retried = harness.checkout("alice", Some("k1")).await.unwrap();

        // Assert
        assert!(retried.replayed);
        assert_eq!(retried.order.items[0].quantity, 2);
        assert_eq!(harness.cart_lines("alice").await, vec![("p1".to_owned(), 1)]);
    }

    #[tokio::test]
    async fn test_keyless_retry_after_cart_edit_creates_no_second_order() {
        // Arrange
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);
        assert!(harness.checkout("alice", None).await.is_err());
        harness.add("alice", "p2", 1500, 1).await;

        // Act
        let retried = harness.checkout("alice", None).await.unwrap();

        // Assert
        assert!(retried.replayed);
        assert_eq!(retried.order.items.len(), 1);
        assert_eq!(retried.order.items[0].product_id.as_str(), "p1");
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(harness.cart_lines("alice").await, vec![("p2".to_owned(), 1)]);
    }

    #[tokio::test]
    async fn test_new_key_completes_interrupted_checkout_before_ordering_the_rest() {
        // Arrange
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_of(CHECKOUT_SETTLED_EVENT_TYPE, 1);
        assert!(harness.checkout("alice", Some("k1")).await.is_err());
        harness.add("alice", "p2", 1500, 1).await;

        // Act
        let second = harness.checkout("alice", Some("k2")).await.unwrap();

        // Assert
        assert!(!second.replayed);
        assert_eq!(second.order.items.len(), 1);
        assert_eq!(second.order.items[0].product_id.as_str(), "p2");
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(harness.cart_lines("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_history_write_leaves_no_order_and_retry_lists_one() {
        // Arrange
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 2).await;
        faulty.fail_appends_to(order_history_id(&user("alice")), 1);

        // Act
        let crashed = harness.checkout("alice", Some("k1")).await;
        let after_crash = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        let retried = harness.checkout("alice", Some("k1")).await.unwrap();

        // Assert
        assert!(matches!(crashed, Err(DomainError::Upstream(_))));
        assert!(after_crash.is_empty());
        assert!(!retried.replayed);
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, retried.order.order_id);
        assert!(harness.cart_lines("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_that_never_placed_its_order_is_abandoned() {
        // Arrange: history is written but placing the order fails.
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 1).await;
        faulty.fail_appends_of(ORDER_PLACED_EVENT_TYPE, 1);
        assert!(harness.checkout("alice", None).await.is_err());
        let pending = snapshot_cart(&user("alice"), harness.repo.as_ref())
            .await
            .unwrap()
            .pending_checkouts;
        harness.add("alice", "p2", 1500, 1).await;

        // Act
        let outcome = harness.checkout("alice", None).await.unwrap();

        // Assert
        assert_eq!(pending.len(), 1);
        assert!(!outcome.replayed);
        assert_ne!(outcome.order.order_id, pending[0].order_id);
        assert_eq!(outcome.order.items.len(), 2);
        let snapshot = snapshot_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert!(snapshot.pending_checkouts.is_empty());
        assert!(snapshot.is_empty());
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checkout_for_same_user_is_conflict() {
        // Arrange
        let harness = Harness::new(Arc::new(InMemoryEventRepository::new()));
        harness.add("alice", "p1", 500, 1).await;
        let _in_flight = harness
            .checkout_tokens
            .try_lock(&checkout_token_key(&user("alice")))
            .unwrap();

        // Act
        let result = harness.checkout("alice", None).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Conflict(_))));
        let cart = get_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_of_other_user_is_not_blocked() {
        let harness = Harness::new(Arc::new(InMemoryEventRepository::new()));
        harness.add("bob", "p1", 500, 1).await;
        let _alice_in_flight = harness
            .checkout_tokens
            .try_lock(&checkout_token_key(&user("alice")))
            .unwrap();

        let outcome = harness.checkout("bob", None).await.unwrap();

        assert_eq!(outcome.order.total.minor_units(), 500);
    }

    #[tokio::test]
    async fn test_transient_snapshot_failures_are_retried() {
        // Arrange
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 1).await;
        let loads_before = faulty.load_calls();
        faulty.fail_loads(2);

        // Act
        let outcome = harness.checkout("alice", None).await.unwrap();

        // Assert
        assert_eq!(outcome.order.total.minor_units(), 500);
        assert!(faulty.load_calls() - loads_before >= 3);
    }

    #[tokio::test]
    async fn test_persistent_snapshot_failure_creates_no_order() {
        let inner: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let faulty = Arc::new(FaultInjectingEventRepository::new(inner));
        let harness = Harness::new(faulty.clone());
        harness.add("alice", "p1", 500, 1).await;
        faulty.fail_loads(10);

        let result = harness.checkout("alice", None).await;

        assert!(matches!(result, Err(DomainError::Upstream(_))));
        faulty.fail_loads(0);
        let orders = list_orders(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_address_is_rejected_before_anything_runs() {
        let harness = Harness::new(Arc::new(InMemoryEventRepository::new()));
        harness.add("alice", "p1", 500, 1).await;
        let mut request = Checkout {
            correlation_id: Uuid::new_v4(),
            user_id: user("alice"),
            address: address(),
            idempotency_key: None,
        };
        request.address.country = "  ".to_owned();

        let result = handle_checkout(&request, harness.deps()).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        let cart = get_cart(&user("alice"), harness.repo.as_ref()).await.unwrap();
        assert_eq!(
            cart.items[0].product_id,
            ProductId::parse("p1").unwrap()
        );
    }
}
