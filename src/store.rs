use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use ulid::Ulid;

use crate::engine::{EngineError, ReservationSource, ReservationStore, StoreError};
use crate::limits::*;
use crate::model::*;
use crate::time::to_minutes;
use crate::wal::ReservationLog;

/// Reference storage collaborator: everything in `DashMap`s, optionally made
/// durable by a reservation log that is written before memory is touched.
pub struct InMemoryStore {
    restaurants: DashMap<Ulid, Restaurant>,
    tables: DashMap<Ulid, Table>,
    reservations: DashMap<Ulid, Reservation>,
    /// (table, date) → ids of every reservation on that table that day.
    by_table_date: DashMap<(Ulid, NaiveDate), Vec<Ulid>>,
    log: Option<Mutex<ReservationLog>>,
    /// Held across the uniqueness scan and the write in `create_table`.
    admin: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Volatile store with no log.
    pub fn new() -> Self {
        Self {
            restaurants: DashMap::new(),
            tables: DashMap::new(),
            reservations: DashMap::new(),
            by_table_date: DashMap::new(),
            log: None,
            admin: Mutex::new(()),
        }
    }

    /// Rebuild state from the log at `path` and keep appending to it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (log, events) = ReservationLog::open(path)?;
        let mut store = Self::new();
        for event in &events {
            store.apply(event);
        }
        info!(
            path = %path.display(),
            records = events.len(),
            restaurants = store.restaurants.len(),
            reservations = store.reservations.len(),
            "reservation log replayed"
        );
        store.log = Some(Mutex::new(log));
        Ok(store)
    }

    /// Log first, then apply. The log lock is held across both so replay
    /// order always matches apply order.
    async fn persist_and_apply(&self, event: Event) -> Result<(), StoreError> {
        match &self.log {
            Some(log) => {
                let mut log = log.lock().await;
                log.append(&event)?;
                self.apply(&event);
            }
            None => self.apply(&event),
        }
        Ok(())
    }

    fn apply(&self, event: &Event) {
        match event {
            Event::RestaurantCreated(r) => {
                self.restaurants.insert(r.id, r.clone());
            }
            Event::TableCreated(t) => {
                self.tables.insert(t.id, t.clone());
            }
            Event::TableAvailabilitySet { id, available } => {
                if let Some(mut t) = self.tables.get_mut(id) {
                    t.is_available = *available;
                }
            }
            Event::ReservationCreated(r) => {
                self.index(r.table_id, r.date, r.id);
                self.reservations.insert(r.id, r.clone());
            }
            Event::ReservationUpdated(r) => {
                let previous = self.reservations.get(&r.id).map(|e| (e.table_id, e.date));
                match previous {
                    Some(key) if key == (r.table_id, r.date) => {}
                    Some(key) => {
                        self.unindex(key, r.id);
                        self.index(r.table_id, r.date, r.id);
                    }
                    None => self.index(r.table_id, r.date, r.id),
                }
                self.reservations.insert(r.id, r.clone());
            }
            Event::ReservationStatusChanged { id, status } => {
                if let Some(mut r) = self.reservations.get_mut(id) {
                    r.status = *status;
                }
            }
        }
    }

    fn index(&self, table_id: Ulid, date: NaiveDate, id: Ulid) {
        self.by_table_date.entry((table_id, date)).or_default().push(id);
    }

    fn unindex(&self, key: (Ulid, NaiveDate), id: Ulid) {
        if let Some(mut ids) = self.by_table_date.get_mut(&key) {
            ids.retain(|r| *r != id);
        }
    }

    // ── Administration ───────────────────────────────────────

    pub async fn create_restaurant(
        &self,
        name: &str,
        opening_time: &str,
        closing_time: &str,
        total_tables: u32,
    ) -> Result<Restaurant, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidArgument("restaurant name is required"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("restaurant name too long"));
        }
        let opening_time = to_minutes(opening_time)?;
        let closing_time = to_minutes(closing_time)?;
        if opening_time >= closing_time {
            return Err(EngineError::InvalidArgument("opening time must be before closing time"));
        }
        let restaurant = Restaurant {
            id: Ulid::new(),
            name: name.to_string(),
            opening_time,
            closing_time,
            total_tables,
        };
        self.persist_and_apply(Event::RestaurantCreated(restaurant.clone()))
            .await?;
        Ok(restaurant)
    }

    pub async fn create_table(
        &self,
        restaurant_id: Ulid,
        number: u32,
        capacity: u32,
    ) -> Result<Table, EngineError> {
        if !self.restaurants.contains_key(&restaurant_id) {
            return Err(EngineError::NotFound { kind: "restaurant", id: restaurant_id });
        }
        if capacity == 0 {
            return Err(EngineError::InvalidArgument("table capacity must be positive"));
        }
        if capacity > MAX_TABLE_CAPACITY {
            return Err(EngineError::LimitExceeded("table capacity too large"));
        }
        let _admin = self.admin.lock().await;
        let mut count = 0usize;
        for t in self.tables.iter().filter(|t| t.restaurant_id == restaurant_id) {
            if t.number == number {
                return Err(StoreError::DuplicateTableNumber { restaurant_id, number }.into());
            }
            count += 1;
        }
        if count >= MAX_TABLES_PER_RESTAURANT {
            return Err(EngineError::LimitExceeded("too many tables"));
        }
        let table = Table {
            id: Ulid::new(),
            restaurant_id,
            number,
            capacity,
            is_available: true,
        };
        self.persist_and_apply(Event::TableCreated(table.clone())).await?;
        Ok(table)
    }

    /// Take a table out of service (or back in). Existing reservations are untouched.
    pub async fn set_table_available(&self, id: Ulid, available: bool) -> Result<(), EngineError> {
        if !self.tables.contains_key(&id) {
            return Err(EngineError::NotFound { kind: "table", id });
        }
        self.persist_and_apply(Event::TableAvailabilitySet { id, available })
            .await?;
        Ok(())
    }

    /// Every restaurant, ordered by name.
    pub fn list_restaurants(&self) -> Vec<Restaurant> {
        let mut all: Vec<Restaurant> = self.restaurants.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        all
    }

    /// All tables of a restaurant by number, out-of-service ones included.
    pub fn list_tables(&self, restaurant_id: Ulid) -> Vec<Table> {
        let mut tables: Vec<Table> = self
            .tables
            .iter()
            .filter(|t| t.restaurant_id == restaurant_id)
            .map(|t| t.value().clone())
            .collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    /// Records currently in the log. Zero for a volatile store.
    pub async fn log_records(&self) -> u64 {
        match &self.log {
            Some(log) => log.lock().await.records(),
            None => 0,
        }
    }

    /// Rewrite the log as the minimal events that recreate current state.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let Some(log) = &self.log else { return Ok(()) };
        let mut log = log.lock().await;

        let mut events: Vec<Event> = self
            .restaurants
            .iter()
            .map(|e| Event::RestaurantCreated(e.value().clone()))
            .collect();
        events.extend(self.tables.iter().map(|e| Event::TableCreated(e.value().clone())));
        events.extend(
            self.reservations
                .iter()
                .map(|e| Event::ReservationCreated(e.value().clone())),
        );

        let before = log.records();
        log.compact(&events)?;
        info!(before, after = events.len(), "reservation log compacted");
        Ok(())
    }
}

#[async_trait]
impl ReservationSource for InMemoryStore {
    async fn fetch_active_reservations(
        &self,
        table_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let ids = self
            .by_table_date
            .get(&(table_id, date))
            .map(|e| e.value().clone())
            .unwrap_or_default();
        let mut active: Vec<Reservation> = ids
            .iter()
            .filter_map(|id| self.reservations.get(id).map(|e| e.value().clone()))
            .filter(|r| r.status.is_active() && r.table_id == table_id && r.date == date)
            .collect();
        active.sort_by_key(|r| r.start);
        Ok(active)
    }

    async fn fetch_tables(
        &self,
        restaurant_id: Ulid,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Table>, StoreError> {
        let min = min_capacity.unwrap_or(0);
        let mut tables: Vec<Table> = self
            .tables
            .iter()
            .filter(|t| t.restaurant_id == restaurant_id && t.is_available && t.capacity >= min)
            .map(|t| t.value().clone())
            .collect();
        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn get_restaurant(&self, id: Ulid) -> Result<Option<Restaurant>, StoreError> {
        Ok(self.restaurants.get(&id).map(|e| e.value().clone()))
    }

    async fn get_table(&self, id: Ulid) -> Result<Option<Table>, StoreError> {
        Ok(self.tables.get(&id).map(|e| e.value().clone()))
    }

    async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.reservations.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(StoreError::Duplicate(reservation.id));
        }
        self.persist_and_apply(Event::ReservationCreated(reservation))
            .await
    }

    async fn update_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        if !self.reservations.contains_key(&reservation.id) {
            return Err(StoreError::UnknownRecord(reservation.id));
        }
        self.persist_and_apply(Event::ReservationUpdated(reservation))
            .await
    }

    async fn set_reservation_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<(), StoreError> {
        if !self.reservations.contains_key(&id) {
            return Err(StoreError::UnknownRecord(id));
        }
        self.persist_and_apply(Event::ReservationStatusChanged { id, status })
            .await
    }

    async fn list_reservations(
        &self,
        restaurant_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut day: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id && r.date == date && r.status.is_active())
            .map(|r| r.value().clone())
            .collect();
        day.sort_by_key(|r| r.start);
        Ok(day)
    }
}
