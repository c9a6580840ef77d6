//! In-memory implementation of the `EventRepository` trait.
//!
//! Not durable: all streams are lost on restart. Used when no database is
//! configured and by the HTTP integration tests. Appends enforce the same
//! optimistic-concurrency contract as the PostgreSQL store, serialized by a
//! single write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use storefront_core::error::DomainError;
use storefront_core::repository::{EventRepository, StoredEvent};

use crate::pg_event_repository::check_contiguous;

/// Process-local event repository.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams
            .read()
            .await
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        check_contiguous(aggregate_id, expected_version, events)?;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();
        let actual = stream.len() as i64;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_stored_event(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            event_type: "test.event".to_owned(),
            payload: serde_json::json!({ "n": sequence_number }),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_load_events_returns_empty_vec_for_unknown_stream() {
        let repo = InMemoryEventRepository::new();

        let events = repo.load_events(Uuid::new_v4()).await.unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_append_then_load_preserves_order() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        let events = vec![
            make_stored_event(aggregate_id, 1),
            make_stored_event(aggregate_id, 2),
        ];

        // Act
        repo.append_events(aggregate_id, 0, &events).await.unwrap();
        repo.append_events(aggregate_id, 2, &[make_stored_event(aggregate_id, 3)])
            .await
            .unwrap();

        // Assert
        let loaded = repo.load_events(aggregate_id).await.unwrap();
        let sequence: Vec<i64> = loaded.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        assert_eq!(repo.event_count().await, 3);
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_a_conflict() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();
        repo.append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
            .await
            .unwrap();

        // Act: a second writer that also read version 0.
        let result = repo
            .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 1)])
            .await;

        // Assert
        match result.unwrap_err() {
            DomainError::ConcurrencyConflict {
                aggregate_id: id,
                expected,
                actual,
            } => {
                assert_eq!(id, aggregate_id);
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(repo.load_events(aggregate_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_gap_is_rejected() {
        let repo = InMemoryEventRepository::new();
        let aggregate_id = Uuid::new_v4();

        let result = repo
            .append_events(aggregate_id, 0, &[make_stored_event(aggregate_id, 2)])
            .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_streams_are_isolated() {
        let repo = InMemoryEventRepository::new();
        let agg_a = Uuid::new_v4();
        let agg_b = Uuid::new_v4();

        repo.append_events(agg_a, 0, &[make_stored_event(agg_a, 1)])
            .await
            .unwrap();
        repo.append_events(agg_b, 0, &[make_stored_event(agg_b, 1)])
            .await
            .unwrap();

        assert_eq!(repo.load_events(agg_a).await.unwrap()[0].aggregate_id, agg_a);
        assert_eq!(repo.load_events(agg_b).await.unwrap()[0].aggregate_id, agg_b);
    }
}
