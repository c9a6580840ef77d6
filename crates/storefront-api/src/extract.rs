//! Request extractors that reject with the API's JSON error body.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;

use crate::error::ApiError;

/// Header carrying the caller's user id, set by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying a checkout idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// JSON body extractor; malformed bodies become `validation_error` (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same rejection as [`ApiJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The user making the request, read from the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct RequestingUser(pub UserId);

impl RequestingUser {
    /// Reads the requesting user from request headers.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unauthenticated` if the header is missing or
    /// does not hold a valid user id.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let raw = headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| {
                DomainError::Unauthenticated(format!("missing {USER_ID_HEADER} header"))
            })?
            .to_str()
            .map_err(|_| {
                DomainError::Unauthenticated(format!("{USER_ID_HEADER} is not valid text"))
            })?;
        let user_id = UserId::parse(raw)
            .map_err(|e| DomainError::Unauthenticated(format!("{USER_ID_HEADER}: {e}")))?;
        Ok(Self(user_id))
    }
}

impl<S> FromRequestParts<S> for RequestingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
