//! Turns purchase outcomes into notifier messages off the polling path.
//!
//! Watchers enqueue with [`NotificationRelay::notify`], which never waits.
//! A single background worker resolves thumbnails and delivers messages in
//! order. Delivery problems are logged and otherwise ignored.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{OutcomeKind, PurchaseOutcome};
use crate::plugins::traits::{NotificationMessage, Notifier, ThumbnailResolver};

pub const SUCCESS_COLOR: u32 = 0xF58A42;
pub const REJECTED_COLOR: u32 = 0x8115ED;
pub const ERROR_COLOR: u32 = 0xD11197;

#[derive(Debug, Clone)]
pub struct NotificationRelay {
    tx: mpsc::Sender<PurchaseOutcome>,
}

impl NotificationRelay {
    /// Start the delivery worker. It stops once every relay clone is dropped
    /// and the queue is drained.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        thumbnails: Arc<dyn ThumbnailResolver>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<PurchaseOutcome>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(outcome) = rx.recv().await {
                deliver(notifier.as_ref(), thumbnails.as_ref(), &outcome).await;
            }
            debug!("Notification relay stopped");
        });

        (Self { tx }, worker)
    }

    /// Queue an outcome for delivery. Returns `false` when it was dropped.
    pub fn notify(&self, outcome: PurchaseOutcome) -> bool {
        match self.tx.try_send(outcome) {
            Ok(()) => true,
            Err(TrySendError::Full(outcome)) => {
                metrics::counter!("sniper_notifications_dropped_total").increment(1);
                warn!(item_id = %outcome.item_id, "Notification queue full, dropping outcome");
                false
            }
            Err(TrySendError::Closed(outcome)) => {
                metrics::counter!("sniper_notifications_dropped_total").increment(1);
                warn!(item_id = %outcome.item_id, "Notification relay closed, dropping outcome");
                false
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, thumbnails: &dyn ThumbnailResolver, outcome: &PurchaseOutcome) {
    let thumbnail_url = match thumbnails.resolve(&outcome.item_id).await {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(item_id = %outcome.item_id, error = %e, "No thumbnail for notification");
            None
        }
    };

    let message = build_message(outcome, thumbnail_url);
    match notifier.notify(&message).await {
        Ok(result) if result.success => {
            metrics::counter!("sniper_notifications_sent_total").increment(1);
            info!(item_id = %outcome.item_id, notifier = notifier.name(), "Notification sent");
        }
        Ok(result) => {
            metrics::counter!("sniper_notifications_failed_total").increment(1);
            warn!(
                item_id = %outcome.item_id,
                notifier = notifier.name(),
                error = result.error.as_deref().unwrap_or("unknown"),
                "Notification was not accepted"
            );
        }
        Err(e) => {
            metrics::counter!("sniper_notifications_failed_total").increment(1);
            warn!(item_id = %outcome.item_id, notifier = notifier.name(), error = %e, "Notification failed");
        }
    }
}

pub fn build_message(outcome: &PurchaseOutcome, thumbnail_url: Option<String>) -> NotificationMessage {
    let (title, color, description) = match outcome.kind {
        OutcomeKind::Purchased => (
            "Limited Snipe Success",
            SUCCESS_COLOR,
            format!(
                "Item Purchase: `{}`\nSeller ID: `{}`\nPrice: `{}`\nLatency: `{:?}`",
                outcome.item_id, outcome.seller_id, outcome.price, outcome.latency
            ),
        ),
        OutcomeKind::Rejected => (
            "Purchase Failure",
            REJECTED_COLOR,
            format!(
                "Limited ID: `{}`\nLatency: `{:?}`\nMessage: `{}`",
                outcome.item_id, outcome.latency, outcome.reason
            ),
        ),
        OutcomeKind::Error => (
            "Error",
            ERROR_COLOR,
            format!(
                "Limited Item ID: `{}`\nLatency: `{:?}`\nMessage: `{}`",
                outcome.item_id, outcome.latency, outcome.reason
            ),
        ),
    };

    NotificationMessage {
        item_id: outcome.item_id.clone(),
        kind: outcome.kind,
        title: title.to_string(),
        description,
        color,
        thumbnail_url,
    }
}
