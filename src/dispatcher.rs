use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use validator::Validate;

use crate::config::AppConfig;
use crate::coordinator::PurchaseCoordinator;
use crate::models::{ItemStatus, TrackedItem};
use crate::plugins::Collaborators;
use crate::rate_gate::RateGate;
use crate::registry::ItemRegistry;
use crate::relay::NotificationRelay;
use crate::utils::error::AppError;
use crate::watcher::{WatchExit, WatchState, Watcher};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherStats {
    pub total_items: usize,
    pub watching: usize,
    pub idle: usize,
    pub in_queue: usize,
    pub purchased: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub samples: u64,
    pub sample_errors: u64,
    pub attempts: u64,
    pub skipped_claims: u64,
    pub dropped_cycles: u64,
    pub uptime_seconds: u64,
}

/// Where every item ended up when `run` returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub purchased: Vec<String>,
    pub abandoned: Vec<String>,
    pub pending: Vec<String>,
    /// `false` when every watcher ended on its own.
    pub cancelled: bool,
}

pub struct Dispatcher {
    config: AppConfig,
    collaborators: Collaborators,
    registry: ItemRegistry,
    watching: Arc<DashSet<String>>,
    start_time: DateTime<Utc>,
}

impl Dispatcher {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            registry: ItemRegistry::new(),
            watching: Arc::new(DashSet::new()),
            start_time: Utc::now(),
        }
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// Watch every item until `shutdown` is cancelled or no watcher is left.
    pub async fn run(&self, items: Vec<TrackedItem>, shutdown: CancellationToken) -> Result<DispatchReport> {
        self.check_items(&items)?;

        let token = shutdown.child_token();
        let (relay, mut relay_worker) = NotificationRelay::spawn(
            Arc::clone(&self.collaborators.notifier),
            Arc::clone(&self.collaborators.thumbnails),
            self.config.notifications.queue_capacity,
        );

        let state = Arc::new(WatchState {
            registry: self.registry.clone(),
            gate: Arc::new(RateGate::from_config(&self.config.rate_limit)),
            coordinator: PurchaseCoordinator::new(
                self.registry.clone(),
                Arc::clone(&self.collaborators.purchaser),
                Arc::clone(&self.collaborators.session),
            ),
            relay,
            price_source: Arc::clone(&self.collaborators.price_source),
            session: Arc::clone(&self.collaborators.session),
            settings: self.config.watcher.clone(),
        });

        let run_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let mut watchers = JoinSet::new();
        for item in items {
            let item_id = item.id.clone();
            let slot = self.registry.register(item)?;
            self.watching.insert(item_id.clone());

            let watcher = Watcher::new(slot, Arc::clone(&state), token.clone());
            let span = tracing::info_span!("watcher", item_id = %item_id);
            watchers.spawn(
                async move {
                    let exit = watcher.run().await;
                    (item_id, exit)
                }
                .instrument(span),
            );
        }
        drop(state);

        tracing::info!("Dispatcher started {} watchers", self.watching.len());

        let cancelled = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break true,
                joined = watchers.join_next() => match joined {
                    Some(joined) => self.watcher_finished(joined),
                    None => break false,
                },
            }
        };

        if cancelled {
            tracing::info!("Shutdown requested, waiting for watchers to stop");
        } else {
            tracing::info!("Every watcher has finished, nothing left to watch");
        }
        token.cancel();
        while let Some(joined) = watchers.join_next().await {
            self.watcher_finished(joined);
        }
        // A panicked watcher never reported its id
        for item_id in &run_ids {
            if self.watching.remove(item_id).is_some() {
                tracing::warn!("Watcher for {} ended without reporting", item_id);
            }
        }

        // Watchers held the last relay handles; the worker now drains and exits
        let drain_timeout = self.config.notifications.drain_timeout();
        if tokio::time::timeout(drain_timeout, &mut relay_worker).await.is_err() {
            tracing::warn!(
                "Notifications still pending after {:?}, abandoning them",
                drain_timeout
            );
            relay_worker.abort();
        }

        let report = self.report(cancelled);
        tracing::info!(
            "Dispatcher stopped: {} purchased, {} abandoned, {} pending",
            report.purchased.len(),
            report.abandoned.len(),
            report.pending.len()
        );
        Ok(report)
    }

    pub fn is_watching(&self, item_id: &str) -> bool {
        self.watching.contains(item_id)
    }

    pub fn stats(&self) -> DispatcherStats {
        let snapshots = self.registry.snapshot();
        let count = |status: ItemStatus| snapshots.iter().filter(|s| s.status == status).count();

        DispatcherStats {
            total_items: snapshots.len(),
            watching: self.watching.len(),
            idle: count(ItemStatus::Idle),
            in_queue: count(ItemStatus::InQueue),
            purchased: count(ItemStatus::Purchased),
            failed: count(ItemStatus::Failed),
            abandoned: snapshots.iter().filter(|s| s.abandoned).count(),
            samples: snapshots.iter().map(|s| s.samples).sum(),
            sample_errors: snapshots.iter().map(|s| s.sample_errors).sum(),
            attempts: snapshots.iter().map(|s| s.attempts).sum(),
            skipped_claims: snapshots.iter().map(|s| s.skipped_claims).sum(),
            dropped_cycles: snapshots.iter().map(|s| s.dropped_cycles).sum(),
            uptime_seconds: (Utc::now() - self.start_time).num_seconds().max(0) as u64,
        }
    }

    fn check_items(&self, items: &[TrackedItem]) -> Result<()> {
        if items.is_empty() {
            return Err(AppError::Validation("No items to watch".to_string()));
        }

        let mut seen = HashSet::new();
        for item in items {
            item.validate()?;
            if !seen.insert(item.id.as_str()) || self.registry.get(&item.id).is_some() {
                return Err(AppError::Validation(format!("Duplicate item id {}", item.id)));
            }
        }
        Ok(())
    }

    fn watcher_finished(&self, joined: std::result::Result<(String, WatchExit), tokio::task::JoinError>) {
        match joined {
            Ok((item_id, exit)) => {
                self.watching.remove(&item_id);
                tracing::debug!("Watcher for {} finished: {:?}", item_id, exit);
            }
            Err(e) => {
                // The span carried the id; `run` clears it once the set is drained
                tracing::error!("Watcher task failed: {}", e);
            }
        }
    }

    fn report(&self, cancelled: bool) -> DispatchReport {
        let mut report = DispatchReport {
            cancelled,
            ..Default::default()
        };
        for snapshot in self.registry.snapshot() {
            if snapshot.status == ItemStatus::Purchased {
                report.purchased.push(snapshot.id);
            } else if snapshot.abandoned {
                report.abandoned.push(snapshot.id);
            } else {
                report.pending.push(snapshot.id);
            }
        }
        report
    }
}
