//! Domain layer for the Cart Ledger context.

pub mod aggregates;
pub mod commands;
pub mod events;
