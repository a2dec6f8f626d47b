//! One watcher per tracked item.
//!
//! The first sample resolves the item's listing identity; if it fails the
//! watcher gives up on that item for good. After that the watcher wakes up
//! every poll interval and hands a cycle (gate, sample, evaluate, maybe
//! purchase) to a background task without waiting for it. Cycles are
//! admitted through a per-item semaphore; a tick that finds no free permit
//! is dropped rather than queued.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::WatcherConfig;
use crate::coordinator::PurchaseCoordinator;
use crate::models::{ItemStatus, PurchaseAttempt, SampleResult};
use crate::plugins::traits::{PriceSource, SessionProvider};
use crate::rate_gate::RateGate;
use crate::registry::{ItemRegistry, ItemSlot, ReferenceChange};
use crate::relay::NotificationRelay;
use crate::utils::error::AppError;
use crate::Result;

/// State shared by every watcher of one dispatcher run.
#[derive(Clone)]
pub struct WatchState {
    pub registry: ItemRegistry,
    pub gate: Arc<RateGate>,
    pub coordinator: PurchaseCoordinator,
    pub relay: NotificationRelay,
    pub price_source: Arc<dyn PriceSource>,
    pub session: Arc<dyn SessionProvider>,
    pub settings: WatcherConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Purchased,
    /// The first sample could not identify a listing.
    Abandoned,
    Cancelled,
}

pub struct Watcher {
    slot: Arc<ItemSlot>,
    state: Arc<WatchState>,
    shutdown: CancellationToken,
}

impl Watcher {
    pub fn new(slot: Arc<ItemSlot>, state: Arc<WatchState>, shutdown: CancellationToken) -> Self {
        Self {
            slot,
            state,
            shutdown,
        }
    }

    pub async fn run(self) -> WatchExit {
        let item_id = self.slot.id().to_string();
        debug!(item_id = %item_id, threshold = self.slot.item().threshold_price, "Watcher started");

        let first = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return WatchExit::Cancelled,
            result = sample(&self.state, &self.slot) => result,
        };

        let first = match first {
            Ok(sample) if sample.identifies_listing() => sample,
            Ok(sample) => {
                return self.abandon(format!(
                    "listing not identifiable (product id {}, price {})",
                    sample.product_id, sample.price
                ));
            }
            Err(e) => return self.abandon(e.to_string()),
        };

        let started = Instant::now();
        evaluate(&self.state, &self.slot, &first).await;
        self.slot.record_cycle(started.elapsed());

        let capacity = self.state.settings.cycle_permits();
        let permits = Arc::new(Semaphore::new(capacity as usize));

        let exit = loop {
            if self.slot.status() == ItemStatus::Purchased {
                break WatchExit::Purchased;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break WatchExit::Cancelled,
                _ = tokio::time::sleep(self.state.settings.poll_interval()) => {}
            }

            if self.slot.status() == ItemStatus::Purchased {
                break WatchExit::Purchased;
            }

            match Arc::clone(&permits).try_acquire_owned() {
                Ok(permit) => {
                    let state = Arc::clone(&self.state);
                    let slot = Arc::clone(&self.slot);
                    let shutdown = self.shutdown.clone();
                    tokio::spawn(
                        async move {
                            run_cycle(&state, &slot, &shutdown).await;
                            drop(permit);
                        }
                        .in_current_span(),
                    );
                }
                Err(_) => {
                    self.slot.record_dropped_cycle();
                    metrics::counter!("sniper_dropped_cycles_total").increment(1);
                    debug!(item_id = %item_id, "Previous cycle still running, dropping this one");
                }
            }
        };

        // Let in-flight cycles finish so their outcomes are recorded
        let _ = permits.acquire_many(capacity).await;

        info!(item_id = %item_id, exit = ?exit, iterations = self.slot.iterations(), "Watcher stopped");
        exit
    }

    fn abandon(&self, reason: String) -> WatchExit {
        self.slot.record_sample_error();
        self.slot.mark_abandoned();
        metrics::counter!("sniper_items_abandoned_total").increment(1);
        let err = AppError::IdentityResolution {
            item_id: self.slot.id().to_string(),
            reason,
        };
        error!(item_id = %self.slot.id(), "{}, no longer watching", err);
        WatchExit::Abandoned
    }
}

async fn sample(state: &WatchState, slot: &ItemSlot) -> Result<SampleResult> {
    state.gate.acquire().await;
    state.price_source.sample(slot.id(), &state.session.cookie()).await
}

async fn run_cycle(state: &WatchState, slot: &ItemSlot, shutdown: &CancellationToken) {
    if slot.status().is_terminal() {
        return;
    }

    let started = Instant::now();
    if state.settings.verbose {
        debug!(
            item_id = %slot.id(),
            iteration = slot.iterations() + 1,
            last_cycle = ?slot.last_cycle(),
            "Starting cycle"
        );
    }

    if slot.status() == ItemStatus::Failed {
        let backoff = state.settings.failure_backoff();
        if !backoff.is_zero() {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
        }
        if slot.reset_failed() {
            info!(item_id = %slot.id(), "Resuming after failed purchase");
        }
    }

    let result = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return,
        result = sample(state, slot) => result,
    };

    match result {
        Ok(sampled) if sampled.identifies_listing() => evaluate(state, slot, &sampled).await,
        Ok(sampled) => transient_error(
            slot,
            format!(
                "listing not identifiable (product id {}, price {})",
                sampled.product_id, sampled.price
            ),
        ),
        Err(e) => transient_error(slot, e.to_string()),
    }

    slot.record_cycle(started.elapsed());
}

fn transient_error(slot: &ItemSlot, reason: String) {
    slot.record_sample_error();
    metrics::counter!("sniper_sample_errors_total").increment(1);
    let err = AppError::TransientSample {
        item_id: slot.id().to_string(),
        reason,
    };
    warn!(item_id = %slot.id(), "{}", err);
}

async fn evaluate(state: &WatchState, slot: &ItemSlot, sampled: &SampleResult) {
    slot.record_sample();
    metrics::counter!("sniper_samples_total").increment(1);

    match slot.update_reference(sampled.reference()) {
        ReferenceChange::First => debug!(
            item_id = %slot.id(),
            seller_id = sampled.seller_id,
            user_asset_id = sampled.user_asset_id,
            baseline_price = sampled.price,
            "Resolved listing"
        ),
        ReferenceChange::Changed { previous } => info!(
            item_id = %slot.id(),
            previous_seller_id = previous.seller_id,
            seller_id = sampled.seller_id,
            user_asset_id = sampled.user_asset_id,
            "Lowest listing changed hands"
        ),
        ReferenceChange::Unchanged => {}
    }

    let item = slot.item();
    if !item.should_purchase(sampled.price) {
        debug!(item_id = %item.id, price = sampled.price, threshold = item.threshold_price, "No buy");
        return;
    }

    if let PurchaseAttempt::Completed(outcome) = state.coordinator.try_purchase(item, sampled).await {
        state.relay.notify(outcome);
    }
}
