//! Storefront — Order Ledger bounded context.
//!
//! Orders are immutable snapshots of a cart taken at checkout. After
//! placement only the status moves, along a fixed lifecycle. Each order is
//! its own event stream; a per-user history stream lists them.

pub mod application;
pub mod domain;
