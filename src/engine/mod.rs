mod availability;
mod booking;
mod error;
mod ranking;
mod source;
#[cfg(test)]
mod proptests;

pub use availability::{find_conflict, nearest_slots, SlotQuery};
pub use booking::{BookingRequest, ReservationUpdate};
pub use error::{EngineError, StoreError};
pub use ranking::{find_optimal, rank, suggest_combinations, utilization, TableCombination};
pub use source::{ReservationSource, ReservationStore};

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::model::Minutes;
use crate::notify::NotifyHub;

pub const DEFAULT_SLOT_GRANULARITY: Minutes = 30;
pub const DEFAULT_DURATION_HOURS: f64 = 2.0;
pub const DEFAULT_ALTERNATIVES: usize = 3;

/// Serializes check-then-write for one table on one day.
pub type BookingLock = Arc<Mutex<()>>;

/// Availability and conflict-resolution engine.
///
/// Holds no calendar of its own: every query re-reads the reservation set
/// from the store, so there is nothing to invalidate when the store changes.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    pub notify: Arc<NotifyHub>,
    booking_locks: DashMap<(Ulid, NaiveDate), BookingLock>,
    default_duration_hours: f64,
    alternatives: usize,
    slot_granularity: Minutes,
}

impl Engine {
    pub fn new(store: Arc<dyn ReservationStore>, notify: Arc<NotifyHub>) -> Self {
        Self {
            store,
            notify,
            booking_locks: DashMap::new(),
            default_duration_hours: DEFAULT_DURATION_HOURS,
            alternatives: DEFAULT_ALTERNATIVES,
            slot_granularity: DEFAULT_SLOT_GRANULARITY,
        }
    }

    pub fn with_default_duration(mut self, hours: f64) -> Self {
        self.default_duration_hours = hours;
        self
    }

    pub fn with_alternatives(mut self, limit: usize) -> Self {
        self.alternatives = limit;
        self
    }

    /// Step between candidate start times when offering alternatives.
    pub fn with_slot_granularity(mut self, minutes: Minutes) -> Self {
        self.slot_granularity = minutes;
        self
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    fn booking_lock(&self, table_id: Ulid, date: NaiveDate) -> BookingLock {
        self.booking_locks
            .entry((table_id, date))
            .or_default()
            .value()
            .clone()
    }

    /// Lock every (table, date) in `keys`, in key order so two writers
    /// needing the same pair of days cannot deadlock.
    async fn lock_days(&self, keys: &[(Ulid, NaiveDate)]) -> Vec<OwnedMutexGuard<()>> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for (table_id, date) in keys {
            guards.push(self.booking_lock(table_id, date).lock_owned().await);
        }
        guards
    }
}
