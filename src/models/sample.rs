use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::ItemReference;

/// One observation of an item's live price and identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleResult {
    pub price: i64,
    pub product_id: i64,
    pub seller_id: i64,
    pub user_asset_id: i64,
    pub sampled_at: DateTime<Utc>,
}

impl SampleResult {
    pub fn new(price: i64, product_id: i64, seller_id: i64, user_asset_id: i64) -> Self {
        Self {
            price,
            product_id,
            seller_id,
            user_asset_id,
            sampled_at: Utc::now(),
        }
    }

    /// A sample without a product id, or with a negative price, cannot
    /// identify a purchasable listing.
    pub fn identifies_listing(&self) -> bool {
        self.product_id != 0 && self.price >= 0
    }

    pub fn reference(&self) -> ItemReference {
        ItemReference {
            seller_id: self.seller_id,
            user_asset_id: self.user_asset_id,
            baseline_price: self.price,
        }
    }
}
