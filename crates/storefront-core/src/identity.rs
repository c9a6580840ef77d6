//! Opaque user and product identifiers, and stream id derivation.
//!
//! Identifiers arrive from the auth provider and the catalog as arbitrary
//! strings. They are trimmed and bounded but otherwise not interpreted.
//! Event streams are keyed by UUID, so per-user streams derive a stable
//! UUID v5 from a context namespace and the identifier.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Maximum accepted identifier length, in bytes.
pub const MAX_ID_LEN: usize = 128;

fn normalize(kind: &str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{kind} must not be blank")));
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(DomainError::Validation(format!(
            "{kind} exceeds {MAX_ID_LEN} bytes"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(DomainError::Validation(format!(
            "{kind} must not contain control characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Identifier of the user owning a cart, wishlist or order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates and wraps a raw user identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the identifier is blank, too long
    /// or contains control characters.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        normalize("user id", raw).map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Validates and wraps a raw product identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the identifier is blank or too long.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        normalize("product id", raw).map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the stream id for a per-user aggregate in the given namespace.
#[must_use]
pub fn user_stream_id(namespace: &Uuid, user_id: &UserId) -> Uuid {
    Uuid::new_v5(namespace, user_id.as_str().as_bytes())
}

/// Derives a stream id from a user and a caller-chosen key within it.
///
/// The unit separator keeps `("ab", "c")` and `("a", "bc")` distinct; user
/// ids and keys are validated to never contain it.
#[must_use]
pub fn keyed_stream_id(namespace: &Uuid, user_id: &UserId, key: &str) -> Uuid {
    let name = format!("{}\u{1f}{key}", user_id.as_str());
    Uuid::new_v5(namespace, name.as_bytes())
}
