//! Currency amounts in minor units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A non-negative amount in minor currency units (e.g. cents).
///
/// Integer arithmetic avoids the floating-point drift of storing display
/// prices directly. All arithmetic is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `minor_units` is negative.
    pub fn from_minor(minor_units: i64) -> Result<Self, DomainError> {
        if minor_units < 0 {
            return Err(DomainError::Validation(format!(
                "amount must be non-negative, got {minor_units}"
            )));
        }
        Ok(Self(minor_units))
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on overflow.
    pub fn times(self, quantity: u32) -> Result<Self, DomainError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or_else(|| DomainError::Validation(format!("amount overflow: {self} x {quantity}")))
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on overflow.
    pub fn plus(self, other: Self) -> Result<Self, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::Validation(format!("amount overflow: {self} + {other}")))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Self::from_minor(raw).map_err(serde::de::Error::custom)
    }
}
