//! Storefront event stores.
//!
//! `PgEventRepository` persists streams in PostgreSQL; `InMemoryEventRepository`
//! keeps them in process memory for local development and tests.

pub mod memory_event_repository;
pub mod pg_event_repository;
