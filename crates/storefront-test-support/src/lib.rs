//! Shared test mocks and utilities for the storefront backend.

mod clock;
mod fixtures;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use fixtures::{product, user};
pub use repository::{
    EmptyEventRepository, FailingEventRepository, FaultInjectingEventRepository,
    RecordingEventRepository,
};
