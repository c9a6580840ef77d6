//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type shared by every bounded context.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A requested record (order, product, cart entry) does not exist or is
    /// not visible to the requester.
    #[error("not found: {0}")]
    NotFound(String),

    /// Checkout was attempted against a cart with no entries.
    #[error("cart for user {0} is empty")]
    EmptyCart(String),

    /// An order status change outside the allowed lifecycle.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Status the order is currently in.
        from: String,
        /// Status that was requested.
        to: String,
    },

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A concurrent operation holds the resource (e.g. a checkout in flight).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A validation error in domain logic or an inbound payload.
    #[error("validation error: {0}")]
    Validation(String),

    /// A backing store or external collaborator is unavailable or returned
    /// unreadable data.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The request carried no caller identity.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl DomainError {
    /// Returns `true` when an idempotent read may be retried after this error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Returns `true` for conflicts the caller may resolve by re-reading state.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_is_transient() {
        assert!(DomainError::Upstream("db down".into()).is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
        assert!(!DomainError::Conflict("busy".into()).is_transient());
    }

    #[test]
    fn test_both_conflict_variants_are_conflicts() {
        let optimistic = DomainError::ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            expected: 1,
            actual: 2,
        };
        assert!(optimistic.is_conflict());
        assert!(DomainError::Conflict("checkout in progress".into()).is_conflict());
        assert!(!DomainError::NotFound("order".into()).is_conflict());
    }

    #[test]
    fn test_invalid_transition_message_names_both_states() {
        let err = DomainError::InvalidTransition {
            from: "delivered".into(),
            to: "cancelled".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid transition from delivered to cancelled"
        );
    }
}
