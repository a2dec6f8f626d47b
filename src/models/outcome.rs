use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Purchased,
    /// Executor answered but did not buy (outbid, stock gone, ...).
    Rejected,
    /// Transport, API or credential failure.
    Error,
}

/// Result of one purchase attempt. Produced once, handed to the
/// notification relay, then dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOutcome {
    pub item_id: String,
    pub kind: OutcomeKind,
    pub price: i64,
    pub seller_id: i64,
    pub latency: Duration,
    pub reason: String,
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Purchased
    }
}

/// What `PurchaseCoordinator::try_purchase` hands back to a watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseAttempt {
    Completed(PurchaseOutcome),
    /// Another task holds the claim, or the item is no longer claimable.
    Skipped,
}

impl PurchaseAttempt {
    pub fn outcome(&self) -> Option<&PurchaseOutcome> {
        match self {
            PurchaseAttempt::Completed(outcome) => Some(outcome),
            PurchaseAttempt::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PurchaseAttempt::Skipped)
    }
}
