//! Storefront — read-only Catalog Store.
//!
//! Product records used for browsing. Carts and wishlists capture the fields
//! they display when a product enters them, so the catalog is never read
//! during checkout.

pub mod filter;
pub mod memory_catalog;
pub mod pg_catalog_store;
pub mod product;
pub mod store;
