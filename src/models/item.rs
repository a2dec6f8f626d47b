use serde::{Deserialize, Serialize};
use validator::Validate;

/// A marketplace listing watched for a price drop.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct TrackedItem {
    #[validate(length(min = 1, message = "item id must not be empty"))]
    pub id: String,

    /// Maximum price at which a purchase is attempted.
    #[validate(range(min = 1, message = "threshold price must be positive"))]
    pub threshold_price: i64,
}

impl TrackedItem {
    pub fn new(id: impl Into<String>, threshold_price: i64) -> Self {
        Self {
            id: id.into(),
            threshold_price,
        }
    }

    /// Purchase condition: `0 < price <= threshold`.
    pub fn should_purchase(&self, price: i64) -> bool {
        price > 0 && price <= self.threshold_price
    }
}

/// Seller and asset identifiers learned from a sample, needed to place a
/// valid purchase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemReference {
    pub seller_id: i64,
    pub user_asset_id: i64,
    pub baseline_price: i64,
}
