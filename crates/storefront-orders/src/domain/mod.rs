//! Domain layer for the Order Ledger context.

pub mod address;
pub mod aggregates;
pub mod commands;
pub mod events;
pub mod status;
