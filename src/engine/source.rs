use async_trait::async_trait;
use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::StoreError;

/// Read side the availability engine needs from storage.
#[async_trait]
pub trait ReservationSource: Send + Sync {
    /// Pending and confirmed reservations for one table on one day, by start time.
    async fn fetch_active_reservations(
        &self,
        table_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// In-service tables of a restaurant with `capacity >= min_capacity`, by table number.
    async fn fetch_tables(
        &self,
        restaurant_id: Ulid,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Table>, StoreError>;
}

/// Full storage contract used by the booking operations.
///
/// The engine serializes check-then-write per (table, date) inside one
/// process. A store shared by several processes must reject overlapping
/// active reservations on its own.
#[async_trait]
pub trait ReservationStore: ReservationSource {
    async fn get_restaurant(&self, id: Ulid) -> Result<Option<Restaurant>, StoreError>;

    async fn get_table(&self, id: Ulid) -> Result<Option<Table>, StoreError>;

    async fn get_reservation(&self, id: Ulid) -> Result<Option<Reservation>, StoreError>;

    async fn insert_reservation(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Replace a stored reservation wholesale.
    async fn update_reservation(&self, reservation: Reservation) -> Result<(), StoreError>;

    async fn set_reservation_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<(), StoreError>;

    /// Active reservations of a restaurant on one day, by start time.
    async fn list_reservations(
        &self,
        restaurant_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError>;
}
