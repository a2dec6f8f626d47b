use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::session::Credentials;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub item_id: String,
    pub product_id: i64,
    pub price: i64,
    pub seller_id: i64,
    pub user_asset_id: i64,
}

/// The executor's answer. `purchased == false` is a rejection, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub purchased: bool,
    pub price: i64,
    pub latency: Duration,
    pub reason: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseExecutor: Send + Sync {
    /// `Err` means the purchase call itself failed (network, HTTP status,
    /// undecodable body).
    async fn execute(
        &self,
        request: &PurchaseRequest,
        credentials: &Credentials,
    ) -> Result<PurchaseReceipt>;
}
