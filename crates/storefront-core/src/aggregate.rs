//! Aggregate root abstraction.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::repository::StoredEvent;

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state (used during reconstitution).
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Marks uncommitted events as persisted: the version advances past them
    /// and the pending list is cleared.
    fn clear_uncommitted_events(&mut self);

    /// Returns the sequence number the next produced event must carry.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version() + self.uncommitted_events().len() as i64 + 1
    }

    /// Converts uncommitted events into their persisted representation.
    fn pending_stored_events(&self) -> Vec<StoredEvent> {
        self.uncommitted_events()
            .iter()
            .map(DomainEvent::to_stored)
            .collect()
    }
}

/// Decodes the JSON payload of a stored event into an event kind.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if the payload does not match the
/// expected shape.
pub fn decode_payload<K: serde::de::DeserializeOwned>(
    stored: &StoredEvent,
) -> Result<K, DomainError> {
    serde_json::from_value(stored.payload.clone()).map_err(|e| {
        DomainError::Upstream(format!(
            "event deserialization failed for {} #{}: {e}",
            stored.aggregate_id, stored.sequence_number
        ))
    })
}
