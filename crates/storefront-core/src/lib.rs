//! Storefront Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that all bounded
//! contexts depend on. It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod identity;
pub mod locks;
pub mod money;
pub mod product;
pub mod repository;
