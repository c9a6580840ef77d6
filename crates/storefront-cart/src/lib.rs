//! Storefront — Cart Ledger bounded context.
//!
//! Per-user mapping of product to quantity with product fields captured at
//! add time. Carts are created lazily on first add; a user without a cart
//! reads as an empty cart.

pub mod application;
pub mod domain;
