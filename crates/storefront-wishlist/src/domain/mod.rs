//! Domain layer for the Wishlist Ledger context.

pub mod aggregates;
pub mod commands;
pub mod events;
