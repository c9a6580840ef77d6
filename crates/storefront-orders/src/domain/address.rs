//! Shipping address value object.

use serde::{Deserialize, Serialize};

use storefront_core::error::DomainError;

/// Maximum accepted length of any address field, in bytes.
pub const MAX_FIELD_LEN: usize = 256;

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Returns a trimmed copy with blank optional fields dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first required field that
    /// is blank, or any field longer than [`MAX_FIELD_LEN`].
    pub fn normalized(&self) -> Result<Self, DomainError> {
        Ok(Self {
            full_name: required("fullName", &self.full_name)?,
            line1: required("line1", &self.line1)?,
            line2: optional("line2", self.line2.as_deref())?,
            city: required("city", &self.city)?,
            region: optional("region", self.region.as_deref())?,
            postal_code: required("postalCode", &self.postal_code)?,
            country: required("country", &self.country)?,
            phone: optional("phone", self.phone.as_deref())?,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!(
            "address field {field} is required"
        )));
    }
    bounded(field, value)
}

fn optional(field: &str, value: Option<&str>) -> Result<Option<String>, DomainError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => bounded(field, v).map(Some),
        _ => Ok(None),
    }
}

fn bounded(field: &str, value: &str) -> Result<String, DomainError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(DomainError::Validation(format!(
            "address field {field} exceeds {MAX_FIELD_LEN} bytes"
        )));
    }
    Ok(value.to_owned())
}
