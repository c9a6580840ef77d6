//! Query handlers for the Wishlist Ledger context.

use serde::Serialize;
use storefront_core::aggregate::AggregateRoot;
use storefront_core::error::DomainError;
use storefront_core::identity::UserId;
use storefront_core::product::ProductSnapshot;
use storefront_core::repository::EventRepository;

use crate::application::command_handlers::load_wishlist;
use crate::domain::aggregates::Wishlist;

/// Read-only view of a user's wishlist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    /// Wishlist owner.
    pub user_id: UserId,
    /// Saved products in insertion order.
    pub items: Vec<ProductSnapshot>,
    /// Stream version the view was built from.
    pub version: i64,
}

impl WishlistView {
    pub(crate) fn from_wishlist(wishlist: &Wishlist) -> Self {
        Self {
            user_id: wishlist.user_id().clone(),
            items: wishlist.entries().to_vec(),
            version: wishlist.version(),
        }
    }
}

/// Returns a user's wishlist. Unknown users get an empty wishlist.
///
/// # Errors
///
/// Returns `DomainError::Upstream` if the stream cannot be read or decoded.
pub async fn get_wishlist(
    user_id: &UserId,
    repo: &dyn EventRepository,
) -> Result<WishlistView, DomainError> {
    let wishlist = load_wishlist(user_id, repo).await?;
    Ok(WishlistView::from_wishlist(&wishlist))
}
