use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use super::{cookie_header, join_url, CSRF_HEADER};
use crate::plugins::traits::{Credentials, PurchaseExecutor, PurchaseReceipt, PurchaseRequest};
use crate::utils::error::AppError;
use crate::Result;

// Robux
const EXPECTED_CURRENCY: i64 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseBody {
    expected_currency: i64,
    expected_price: i64,
    expected_seller_id: i64,
    user_asset_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseResponse {
    #[serde(default)]
    purchased: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    price: Option<i64>,
}

impl PurchaseResponse {
    fn reason(self) -> String {
        self.error_msg
            .filter(|msg| !msg.is_empty())
            .or(self.reason)
            .unwrap_or_default()
    }
}

pub struct EconomyPurchaser {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl EconomyPurchaser {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PurchaseExecutor for EconomyPurchaser {
    async fn execute(&self, request: &PurchaseRequest, credentials: &Credentials) -> Result<PurchaseReceipt> {
        let url = join_url(
            &self.base_url,
            &format!("v1/purchases/products/{}", request.product_id),
        );
        let body = PurchaseBody {
            expected_currency: EXPECTED_CURRENCY,
            expected_price: request.price,
            expected_seller_id: request.seller_id,
            user_asset_id: request.user_asset_id,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(reqwest::header::COOKIE, cookie_header(&credentials.cookie))
            .header(CSRF_HEADER, &credentials.csrf_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PurchaseTransport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Session(format!(
                "purchase endpoint rejected the CSRF token: {}",
                text.trim()
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::PurchaseTransport(format!(
                "purchase endpoint returned status {}: {}",
                status,
                text.trim()
            )));
        }

        let decoded: PurchaseResponse = response
            .json()
            .await
            .map_err(|e| AppError::PurchaseTransport(format!("undecodable purchase response: {}", e)))?;
        let latency = started.elapsed();

        let purchased = decoded.purchased;
        let price = decoded.price.unwrap_or(request.price);
        Ok(PurchaseReceipt {
            purchased,
            price,
            latency,
            reason: decoded.reason(),
        })
    }
}
