//! Concurrent per-item state: lifecycle status, reference identifiers and
//! cycle diagnostics.
//!
//! Every status change goes through an atomic operation on the item's own
//! slot. The map itself is only locked (per shard) to look a slot up.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::models::{ItemReference, ItemStatus, TrackedItem};
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceChange {
    First,
    Unchanged,
    Changed { previous: ItemReference },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub threshold_price: i64,
    pub status: ItemStatus,
    pub reference: Option<ItemReference>,
    pub last_cycle_ms: Option<u64>,
    pub iterations: u64,
    pub samples: u64,
    pub sample_errors: u64,
    pub attempts: u64,
    pub skipped_claims: u64,
    pub dropped_cycles: u64,
    pub abandoned: bool,
}

#[derive(Debug)]
pub struct ItemSlot {
    item: TrackedItem,
    status: AtomicU8,
    reference: Mutex<Option<ItemReference>>,
    // Microseconds + 1, so that zero means "no cycle finished yet".
    last_cycle_micros: AtomicU64,
    iterations: AtomicU64,
    samples: AtomicU64,
    sample_errors: AtomicU64,
    attempts: AtomicU64,
    skipped_claims: AtomicU64,
    dropped_cycles: AtomicU64,
    abandoned: AtomicBool,
}

impl ItemSlot {
    fn new(item: TrackedItem) -> Self {
        Self {
            item,
            status: AtomicU8::new(ItemStatus::Idle.as_u8()),
            reference: Mutex::new(None),
            last_cycle_micros: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            samples: AtomicU64::new(0),
            sample_errors: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            skipped_claims: AtomicU64::new(0),
            dropped_cycles: AtomicU64::new(0),
            abandoned: AtomicBool::new(false),
        }
    }

    pub fn item(&self) -> &TrackedItem {
        &self.item
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn status(&self) -> ItemStatus {
        ItemStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// `Idle -> InQueue`. Only one caller can win; everyone else gets `None`.
    pub fn try_claim(self: &Arc<Self>) -> Option<Claim> {
        self.status
            .compare_exchange(
                ItemStatus::Idle.as_u8(),
                ItemStatus::InQueue.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Claim {
                slot: Arc::clone(self),
                released: false,
            })
    }

    /// `Failed -> Idle`, making the item claimable again.
    pub fn reset_failed(&self) -> bool {
        self.status
            .compare_exchange(
                ItemStatus::Failed.as_u8(),
                ItemStatus::Idle.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn reference(&self) -> Option<ItemReference> {
        *self.reference.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the seller/asset ids of a fresh sample. The baseline price is
    /// the one seen first and never moves.
    pub fn update_reference(&self, observed: ItemReference) -> ReferenceChange {
        let mut guard = self.reference.lock().unwrap_or_else(PoisonError::into_inner);
        match *guard {
            None => {
                *guard = Some(observed);
                ReferenceChange::First
            }
            Some(previous)
                if previous.seller_id == observed.seller_id
                    && previous.user_asset_id == observed.user_asset_id =>
            {
                ReferenceChange::Unchanged
            }
            Some(previous) => {
                *guard = Some(ItemReference {
                    baseline_price: previous.baseline_price,
                    ..observed
                });
                ReferenceChange::Changed { previous }
            }
        }
    }

    pub fn record_cycle(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX - 1);
        self.last_cycle_micros.store(micros + 1, Ordering::Release);
        self.iterations.fetch_add(1, Ordering::AcqRel);
    }

    pub fn last_cycle(&self) -> Option<Duration> {
        match self.last_cycle_micros.load(Ordering::Acquire) {
            0 => None,
            stored => Some(Duration::from_micros(stored - 1)),
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Acquire)
    }

    pub fn record_sample(&self) {
        self.samples.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_sample_error(&self) {
        self.sample_errors.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_skipped_claim(&self) {
        self.skipped_claims.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_dropped_cycle(&self) {
        self.dropped_cycles.fetch_add(1, Ordering::AcqRel);
    }

    pub fn mark_abandoned(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Acquire)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.item.id.clone(),
            threshold_price: self.item.threshold_price,
            status: self.status(),
            reference: self.reference(),
            last_cycle_ms: self.last_cycle().map(|d| d.as_millis() as u64),
            iterations: self.iterations(),
            samples: self.samples(),
            sample_errors: self.sample_errors.load(Ordering::Acquire),
            attempts: self.attempts(),
            skipped_claims: self.skipped_claims.load(Ordering::Acquire),
            dropped_cycles: self.dropped_cycles.load(Ordering::Acquire),
            abandoned: self.is_abandoned(),
        }
    }
}

/// Exclusive right to attempt a purchase. Dropping it without calling
/// [`Claim::release`] leaves the item `Failed`, never `InQueue`.
#[derive(Debug)]
pub struct Claim {
    slot: Arc<ItemSlot>,
    released: bool,
}

impl Claim {
    pub fn item(&self) -> &TrackedItem {
        self.slot.item()
    }

    /// Hand the item back as `Purchased` or `Failed`. Any other status is
    /// treated as `Failed`.
    pub fn release(mut self, status: ItemStatus) {
        let status = match status {
            ItemStatus::Purchased => ItemStatus::Purchased,
            _ => ItemStatus::Failed,
        };
        self.slot.status.store(status.as_u8(), Ordering::Release);
        self.released = true;
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(item_id = %self.slot.id(), "Purchase claim dropped unresolved, marking item failed");
            self.slot
                .status
                .store(ItemStatus::Failed.as_u8(), Ordering::Release);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    slots: Arc<DashMap<String, Arc<ItemSlot>>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item as `Idle`. Ids are unique for the registry's lifetime.
    pub fn register(&self, item: TrackedItem) -> Result<Arc<ItemSlot>> {
        use dashmap::mapref::entry::Entry;

        match self.slots.entry(item.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Validation(format!(
                "item {} is already registered",
                item.id
            ))),
            Entry::Vacant(vacant) => {
                let slot = Arc::new(ItemSlot::new(item));
                vacant.insert(Arc::clone(&slot));
                Ok(slot)
            }
        }
    }

    pub fn get(&self, item_id: &str) -> Option<Arc<ItemSlot>> {
        self.slots.get(item_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn status(&self, item_id: &str) -> Option<ItemStatus> {
        self.slots.get(item_id).map(|entry| entry.status())
    }

    pub fn try_claim(&self, item_id: &str) -> Option<Claim> {
        self.get(item_id)?.try_claim()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn count_status(&self, status: ItemStatus) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.status() == status)
            .count()
    }

    pub fn snapshot(&self) -> Vec<ItemSnapshot> {
        let mut items: Vec<ItemSnapshot> =
            self.slots.iter().map(|entry| entry.snapshot()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}
