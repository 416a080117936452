use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::notify::Notice;
use crate::time::{hours_to_minutes, is_within, parse_date, to_minutes, to_time};

use super::{rank, Engine, EngineError, SlotQuery};

/// A request to seat a party at a specific table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub restaurant_id: Ulid,
    pub table_id: Ulid,
    pub customer_name: String,
    pub customer_phone: String,
    pub party_size: u32,
    pub date: String,
    pub time: String,
    /// Falls back to the engine default (2 hours) when absent.
    pub duration_hours: Option<f64>,
}

/// Fields of an existing reservation to change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration_hours: Option<f64>,
    pub party_size: Option<u32>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

fn validate_customer(name: &str, phone: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidArgument("customer name is required"));
    }
    if phone.trim().is_empty() {
        return Err(EngineError::InvalidArgument("customer phone is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("customer name too long"));
    }
    if phone.len() > MAX_PHONE_LEN {
        return Err(EngineError::LimitExceeded("customer phone too long"));
    }
    Ok(())
}

fn validate_party(party_size: u32, table: &Table) -> Result<(), EngineError> {
    if party_size == 0 {
        return Err(EngineError::InvalidArgument("party size must be positive"));
    }
    if party_size > MAX_PARTY_SIZE {
        return Err(EngineError::LimitExceeded("party too large"));
    }
    if party_size > table.capacity {
        return Err(EngineError::PartySizeExceedsCapacity {
            party_size,
            capacity: table.capacity,
        });
    }
    Ok(())
}

/// Start inside `[open, close)` and end no later than close. Same day only:
/// closing is at most 23:59, so anything running past midnight is rejected.
fn check_operating_hours(restaurant: &Restaurant, span: &Span) -> Result<(), EngineError> {
    let hours = restaurant.hours();
    if !is_within(span.start, hours.start, hours.end) {
        return Err(EngineError::OutsideOperatingHours {
            requested: to_time(span.start),
            opening: to_time(hours.start),
            closing: to_time(hours.end),
        });
    }
    if !hours.contains_span(span) {
        return Err(EngineError::ExtendsPastClosing {
            ends: to_time(span.end),
            closing: to_time(hours.end),
        });
    }
    Ok(())
}

impl Engine {
    async fn require_restaurant(&self, id: Ulid) -> Result<Restaurant, EngineError> {
        self.store
            .get_restaurant(id)
            .await?
            .ok_or(EngineError::NotFound { kind: "restaurant", id })
    }

    async fn require_table(&self, id: Ulid, restaurant_id: Ulid) -> Result<Table, EngineError> {
        self.store
            .get_table(id)
            .await?
            .filter(|t| t.restaurant_id == restaurant_id)
            .ok_or(EngineError::NotFound { kind: "table", id })
    }

    async fn require_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.store
            .get_reservation(id)
            .await?
            .ok_or(EngineError::NotFound { kind: "reservation", id })
    }

    /// Book a table. The availability check and the insert run under the
    /// (table, date) booking lock, so two racing requests for overlapping
    /// times cannot both succeed.
    pub async fn book(&self, req: BookingRequest) -> Result<Reservation, EngineError> {
        validate_customer(&req.customer_name, &req.customer_phone)?;
        let date = parse_date(&req.date)?;
        let start = to_minutes(&req.time)?;
        let duration = hours_to_minutes(req.duration_hours.unwrap_or(self.default_duration_hours))?;

        let restaurant = self.require_restaurant(req.restaurant_id).await?;
        let table = self.require_table(req.table_id, restaurant.id).await?;
        if !table.is_available {
            return Err(EngineError::TableOutOfService(table.id));
        }
        validate_party(req.party_size, &table)?;

        let span = Span::new(start, start + duration);
        check_operating_hours(&restaurant, &span)?;

        let reservation = Reservation {
            id: Ulid::new(),
            restaurant_id: restaurant.id,
            table_id: table.id,
            customer_name: req.customer_name,
            customer_phone: req.customer_phone,
            party_size: req.party_size,
            date,
            start,
            duration_minutes: duration,
            status: ReservationStatus::Confirmed,
        };

        {
            let lock = self.booking_lock(table.id, date);
            let _guard = lock.lock().await;
            if let Some(existing) = self.conflict_at(table.id, date, &span, None).await? {
                metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                warn!(
                    table = table.number,
                    %date,
                    requested = %to_time(start),
                    conflicting = %existing.id,
                    "booking conflict"
                );
                return Err(EngineError::Conflict(existing.id));
            }
            self.store.insert_reservation(reservation.clone()).await?;
        }

        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "status" => "confirmed").increment(1);
        info!(
            reservation = %reservation.id,
            table = table.number,
            %date,
            start = %to_time(start),
            party = reservation.party_size,
            "reservation confirmed"
        );
        self.notify.send(
            restaurant.id,
            Notice::Confirmed {
                reservation: reservation.clone(),
                restaurant: restaurant.name,
            },
        );
        Ok(reservation)
    }

    /// Read a reservation while holding the lock for its current (table, date).
    ///
    /// Status and placement are only ever changed under that lock, so the
    /// returned copy stays current until the guard is dropped.
    async fn lock_reservation(
        &self,
        id: Ulid,
    ) -> Result<(Reservation, Vec<OwnedMutexGuard<()>>), EngineError> {
        loop {
            let seen = self.require_reservation(id).await?;
            let guards = self.lock_days(&[(seen.table_id, seen.date)]).await;
            let current = self.require_reservation(id).await?;
            // Moved to another day while we waited; lock the new one instead.
            if (current.table_id, current.date) == (seen.table_id, seen.date) {
                return Ok((current, guards));
            }
        }
    }

    /// Change an existing reservation. Any change of date, time or duration
    /// is re-checked against operating hours and other reservations.
    ///
    /// The reservation is re-read under the booking lock of both its current
    /// and its target day, so a concurrent cancel is never overwritten.
    pub async fn update_reservation(
        &self,
        id: Ulid,
        update: ReservationUpdate,
    ) -> Result<Reservation, EngineError> {
        let target_date = update.date.as_deref().map(parse_date).transpose()?;
        let target_start = update.time.as_deref().map(to_minutes).transpose()?;
        let target_duration = update.duration_hours.map(hours_to_minutes).transpose()?;

        let (existing, guards) = loop {
            let seen = self.require_reservation(id).await?;
            let from = (seen.table_id, seen.date);
            let to = (seen.table_id, target_date.unwrap_or(seen.date));
            let guards = self.lock_days(&[from, to]).await;
            let current = self.require_reservation(id).await?;
            if (current.table_id, current.date) == from {
                break (current, guards);
            }
        };
        if existing.status == ReservationStatus::Cancelled {
            return Err(EngineError::ReservationCancelled(id));
        }
        let restaurant = self.require_restaurant(existing.restaurant_id).await?;

        let mut updated = existing.clone();
        let mut changes = Vec::new();

        if let Some(date) = target_date {
            updated.date = date;
            if date != existing.date {
                changes.push(format!("Date changed to {date}"));
            }
        }
        if let Some(start) = target_start {
            updated.start = start;
            if start != existing.start {
                changes.push(format!("Time changed to {}", to_time(start)));
            }
        }
        if let Some(minutes) = target_duration {
            updated.duration_minutes = minutes;
            if minutes != existing.duration_minutes {
                changes.push(format!("Duration changed to {} hours", updated.duration_hours()));
            }
        }
        if let Some(party_size) = update.party_size {
            let table = self.require_table(existing.table_id, existing.restaurant_id).await?;
            validate_party(party_size, &table)?;
            updated.party_size = party_size;
            if party_size != existing.party_size {
                changes.push(format!("Party size changed to {party_size}"));
            }
        }
        if let Some(name) = update.customer_name {
            updated.customer_name = name;
        }
        if let Some(phone) = update.customer_phone {
            updated.customer_phone = phone;
        }
        validate_customer(&updated.customer_name, &updated.customer_phone)?;

        let rescheduled = updated.date != existing.date
            || updated.start != existing.start
            || updated.duration_minutes != existing.duration_minutes;
        if rescheduled {
            let span = Span::new(updated.start, updated.end());
            check_operating_hours(&restaurant, &span)?;
            if let Some(other) = self
                .conflict_at(updated.table_id, updated.date, &span, Some(id))
                .await?
            {
                metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                warn!(reservation = %id, conflicting = %other.id, "reschedule conflict");
                return Err(EngineError::Conflict(other.id));
            }
        }
        self.store.update_reservation(updated.clone()).await?;
        drop(guards);

        info!(reservation = %id, changes = changes.len(), "reservation updated");
        if !changes.is_empty() {
            self.notify.send(
                restaurant.id,
                Notice::Updated {
                    reservation: updated.clone(),
                    restaurant: restaurant.name,
                    changes,
                },
            );
        }
        Ok(updated)
    }

    /// Cancel a reservation. Irreversible; the record is kept with status
    /// `cancelled` and its slot becomes free.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let (mut reservation, guards) = self.lock_reservation(id).await?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(EngineError::AlreadyCancelled(id));
        }
        let restaurant = self.require_restaurant(reservation.restaurant_id).await?;
        self.store
            .set_reservation_status(id, ReservationStatus::Cancelled)
            .await?;
        drop(guards);
        reservation.status = ReservationStatus::Cancelled;

        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "status" => "cancelled").increment(1);
        info!(reservation = %id, "reservation cancelled");
        self.notify.send(
            restaurant.id,
            Notice::Cancelled {
                reservation: reservation.clone(),
                restaurant: restaurant.name,
            },
        );
        Ok(reservation)
    }

    /// Mark a seated party as done, freeing the rest of its slot.
    pub async fn complete_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let (mut reservation, guards) = self.lock_reservation(id).await?;
        match reservation.status {
            ReservationStatus::Cancelled => return Err(EngineError::ReservationCancelled(id)),
            ReservationStatus::Completed => return Ok(reservation),
            ReservationStatus::Pending | ReservationStatus::Confirmed => {}
        }
        self.store
            .set_reservation_status(id, ReservationStatus::Completed)
            .await?;
        drop(guards);
        reservation.status = ReservationStatus::Completed;
        metrics::counter!(crate::observability::BOOKINGS_TOTAL, "status" => "completed").increment(1);
        info!(reservation = %id, "reservation completed");
        Ok(reservation)
    }

    /// What is free at `time` for `duration_hours`? With a party size, tables
    /// are filtered and ranked, and nearby alternatives are offered when
    /// nothing fits.
    pub async fn check_availability(
        &self,
        restaurant_id: Ulid,
        date: &str,
        time: &str,
        duration_hours: Option<f64>,
        party_size: Option<u32>,
    ) -> Result<AvailabilityResult, EngineError> {
        let restaurant = self.require_restaurant(restaurant_id).await?;
        let duration_hours = duration_hours.unwrap_or(self.default_duration_hours);
        let free = self
            .available_tables(restaurant_id, date, time, duration_hours, party_size)
            .await?;

        let tables = match party_size {
            Some(party) => rank(&free, party),
            None => free
                .into_iter()
                .map(|table| RankedTable { table, is_optimal: false })
                .collect(),
        };

        let alternative_slots = match party_size {
            Some(party) if tables.is_empty() => {
                let query = SlotQuery::for_restaurant(&restaurant, date, party, duration_hours)?
                    .with_granularity(self.slot_granularity);
                Some(self.alternative_slots(&query, time, self.alternatives).await?)
            }
            _ => None,
        };

        Ok(AvailabilityResult {
            available: !tables.is_empty(),
            tables,
            alternative_slots,
        })
    }

    /// Active reservations for the day in start order, with end times.
    pub async fn daily_schedule(
        &self,
        restaurant_id: Ulid,
        date: &str,
    ) -> Result<Vec<ScheduledReservation>, EngineError> {
        let date: NaiveDate = parse_date(date)?;
        self.require_restaurant(restaurant_id).await?;
        let reservations = self.store.list_reservations(restaurant_id, date).await?;
        Ok(reservations
            .into_iter()
            .map(|reservation| ScheduledReservation {
                end_time: reservation.end(),
                reservation,
            })
            .collect())
    }
}
