//! Application layer for the Order Ledger context.

pub mod command_handlers;
pub mod query_handlers;
