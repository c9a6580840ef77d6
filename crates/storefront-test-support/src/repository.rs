//! Mock `EventRepository` implementations for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storefront_core::error::DomainError;
use storefront_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

/// An event repository that records all `append_events` calls. Returns the
/// configured events from every `load_events` call and always succeeds on
/// `append_events`.
#[derive(Debug)]
pub struct RecordingEventRepository {
    load_result: Mutex<Vec<StoredEvent>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Create a new recording repository that will return `events` from
    /// every `load_events` call.
    #[must_use]
    pub fn new(events: Vec<StoredEvent>) -> Self {
        Self {
            load_result: Mutex::new(events),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_result.lock().unwrap().clone())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for "no cart yet" scenarios.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// An event repository that always returns an upstream error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Upstream("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Upstream("connection refused".into()))
    }
}

/// Which appends a `FaultInjectingEventRepository` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FaultTarget {
    Stream(Uuid),
    EventType(String),
}

impl FaultTarget {
    fn matches(&self, aggregate_id: Uuid, events: &[StoredEvent]) -> bool {
        match self {
            Self::Stream(id) => *id == aggregate_id,
            Self::EventType(event_type) => events.iter().any(|e| &e.event_type == event_type),
        }
    }
}

/// Wraps a real repository and injects failures into selected appends.
///
/// The next `append_failures` matching appends fail with an upstream error
/// without reaching the inner repository, simulating a crash between two
/// writes. Appends are matched by stream or by the type of an event they
/// carry. The next `load_failures` loads of any stream fail the same way.
pub struct FaultInjectingEventRepository {
    inner: Arc<dyn EventRepository>,
    target: Mutex<Option<FaultTarget>>,
    append_failures: AtomicUsize,
    load_failures: AtomicUsize,
    loads: AtomicUsize,
}

impl std::fmt::Debug for FaultInjectingEventRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjectingEventRepository")
            .field("append_failures", &self.append_failures)
            .field("load_failures", &self.load_failures)
            .finish_non_exhaustive()
    }
}

impl FaultInjectingEventRepository {
    /// Wraps `inner` with no faults armed.
    #[must_use]
    pub fn new(inner: Arc<dyn EventRepository>) -> Self {
        Self {
            inner,
            target: Mutex::new(None),
            append_failures: AtomicUsize::new(0),
            load_failures: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    /// Fails the next `count` appends to `target`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_appends_to(&self, target: Uuid, count: usize) {
        *self.target.lock().unwrap() = Some(FaultTarget::Stream(target));
        self.append_failures.store(count, Ordering::SeqCst);
    }

    /// Fails the next `count` appends that carry an event of `event_type`,
    /// whatever stream they target.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_appends_of(&self, event_type: &str, count: usize) {
        *self.target.lock().unwrap() = Some(FaultTarget::EventType(event_type.to_owned()));
        self.append_failures.store(count, Ordering::SeqCst);
    }

    /// Fails the next `count` loads of any stream.
    pub fn fail_loads(&self, count: usize) {
        self.load_failures.store(count, Ordering::SeqCst);
    }

    /// Number of `load_events` calls observed, including failed ones.
    pub fn load_calls(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn take_fault(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EventRepository for FaultInjectingEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if Self::take_fault(&self.load_failures) {
            return Err(DomainError::Upstream("injected load failure".into()));
        }
        self.inner.load_events(aggregate_id).await
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let targeted = self
            .target
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|target| target.matches(aggregate_id, events));
        if targeted && Self::take_fault(&self.append_failures) {
            return Err(DomainError::Upstream("injected append failure".into()));
        }
        self.inner
            .append_events(aggregate_id, expected_version, events)
            .await
    }
}
