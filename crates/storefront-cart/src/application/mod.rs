//! Application layer for the Cart Ledger context.

pub mod command_handlers;
pub mod query_handlers;
