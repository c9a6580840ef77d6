//! Checkout attempt phases.

use serde::Serialize;

/// How far a checkout attempt got.
///
/// `Started → Snapshotted → OrderCreated → CartCleared → Done`. `Failed` is
/// terminal and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutPhase {
    Started,
    Snapshotted,
    OrderCreated,
    CartCleared,
    Done,
    Failed,
}

impl CheckoutPhase {
    /// Returns `true` once an order exists for the attempt.
    #[must_use]
    pub fn has_order(self) -> bool {
        matches!(self, Self::OrderCreated | Self::CartCleared | Self::Done)
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "STARTED"),
            Self::Snapshotted => write!(f, "SNAPSHOTTED"),
            Self::OrderCreated => write!(f, "ORDER_CREATED"),
            Self::CartCleared => write!(f, "CART_CLEARED"),
            Self::Done => write!(f, "DONE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}
