//! Application layer for the Wishlist Ledger context.

pub mod command_handlers;
pub mod query_handlers;
