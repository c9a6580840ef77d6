//! Storefront — Wishlist Ledger bounded context.
//!
//! Per-user set of saved products. No quantities: saving a product twice
//! keeps one entry.

pub mod application;
pub mod domain;
