use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::models::{
    ItemStatus, OutcomeKind, PurchaseAttempt, PurchaseOutcome, SampleResult, TrackedItem,
};
use crate::plugins::traits::{PurchaseExecutor, PurchaseRequest, SessionProvider};
use crate::registry::ItemRegistry;
use crate::utils::error::AppError;

/// Guarantees at most one in-flight purchase per item and records each
/// attempt's result in the registry.
#[derive(Clone)]
pub struct PurchaseCoordinator {
    registry: ItemRegistry,
    purchaser: Arc<dyn PurchaseExecutor>,
    session: Arc<dyn SessionProvider>,
}

impl PurchaseCoordinator {
    pub fn new(
        registry: ItemRegistry,
        purchaser: Arc<dyn PurchaseExecutor>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            registry,
            purchaser,
            session,
        }
    }

    pub async fn try_purchase(&self, item: &TrackedItem, sample: &SampleResult) -> PurchaseAttempt {
        let Some(slot) = self.registry.get(&item.id) else {
            warn!(item_id = %item.id, "Purchase requested for unregistered item");
            return PurchaseAttempt::Skipped;
        };

        let Some(claim) = slot.try_claim() else {
            slot.record_skipped_claim();
            metrics::counter!("sniper_skipped_claims_total").increment(1);
            debug!(item_id = %item.id, status = %slot.status(), "Item is not claimable, skipping purchase");
            return PurchaseAttempt::Skipped;
        };

        slot.record_attempt();
        metrics::counter!("sniper_purchase_attempts_total").increment(1);
        info!(
            item_id = %item.id,
            price = sample.price,
            threshold = item.threshold_price,
            "Price at or below threshold, attempting purchase"
        );

        let request = PurchaseRequest {
            item_id: item.id.clone(),
            product_id: sample.product_id,
            price: sample.price,
            seller_id: sample.seller_id,
            user_asset_id: sample.user_asset_id,
        };

        let started = Instant::now();
        let result = match self.session.credentials().await {
            Ok(credentials) => {
                let result = self.purchaser.execute(&request, &credentials).await;
                if let Err(AppError::Session(_)) = &result {
                    // The next attempt fetches a fresh token
                    self.session.invalidate().await;
                }
                result
            }
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(receipt) if receipt.purchased => {
                claim.release(ItemStatus::Purchased);
                metrics::counter!("sniper_purchases_total").increment(1);
                info!(item_id = %item.id, latency = ?receipt.latency, "Purchase succeeded");
                PurchaseOutcome {
                    item_id: item.id.clone(),
                    kind: OutcomeKind::Purchased,
                    price: if receipt.price > 0 { receipt.price } else { sample.price },
                    seller_id: sample.seller_id,
                    latency: receipt.latency,
                    reason: receipt.reason,
                }
            }
            Ok(receipt) => {
                claim.release(ItemStatus::Failed);
                let reason = if receipt.reason.is_empty() {
                    "not purchased".to_string()
                } else {
                    receipt.reason
                };
                warn!(item_id = %item.id, latency = ?receipt.latency, reason = %reason, "Purchase rejected");
                PurchaseOutcome {
                    item_id: item.id.clone(),
                    kind: OutcomeKind::Rejected,
                    price: sample.price,
                    seller_id: sample.seller_id,
                    latency: receipt.latency,
                    reason,
                }
            }
            Err(e) => {
                claim.release(ItemStatus::Failed);
                error!(item_id = %item.id, error = %e, "Purchase call failed");
                PurchaseOutcome {
                    item_id: item.id.clone(),
                    kind: OutcomeKind::Error,
                    price: sample.price,
                    seller_id: sample.seller_id,
                    latency: started.elapsed(),
                    reason: e.to_string(),
                }
            }
        };

        PurchaseAttempt::Completed(outcome)
    }
}
