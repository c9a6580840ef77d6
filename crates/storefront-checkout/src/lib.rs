//! Storefront — Checkout Coordinator.
//!
//! Turns a consistent snapshot of a user's cart into exactly one order and
//! then removes the purchased lines from the cart. Attempts are keyed by an
//! idempotency key so a retry after a partial failure completes the same
//! order instead of creating another.

pub mod coordinator;
pub mod phase;
pub mod retry;
