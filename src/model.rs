use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::time::hhmm;

/// Minutes since restaurant-local midnight. The only time-of-day type.
pub type Minutes = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minutes,
    pub end: Minutes,
}

impl Span {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Minutes) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Ulid,
    pub name: String,
    #[serde(with = "hhmm")]
    pub opening_time: Minutes,
    #[serde(with = "hhmm")]
    pub closing_time: Minutes,
    /// Informational only; the table set is authoritative.
    pub total_tables: u32,
}

impl Restaurant {
    /// Operating hours as a span. Opening is always before closing, same day.
    pub fn hours(&self) -> Span {
        Span::new(self.opening_time, self.closing_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: Ulid,
    pub restaurant_id: Ulid,
    pub number: u32,
    pub capacity: u32,
    /// Soft-delete / maintenance marker, independent of reservation state.
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Only pending and confirmed reservations hold their slot.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub restaurant_id: Ulid,
    pub table_id: Ulid,
    pub customer_name: String,
    pub customer_phone: String,
    pub party_size: u32,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: Minutes,
    pub duration_minutes: Minutes,
    pub status: ReservationStatus,
}

impl Reservation {
    /// End of the reservation. May exceed 24:00 for malformed records; no wrap.
    pub fn end(&self) -> Minutes {
        self.start + self.duration_minutes
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes as f64 / 60.0
    }
}

/// A candidate start time and how many suitable tables are free at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub time: Minutes,
    pub available_tables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedTable {
    #[serde(flatten)]
    pub table: Table,
    pub is_optimal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utilization {
    pub utilization_percent: f64,
    /// Negative when the party is larger than the table.
    pub wasted_seats: i64,
}

/// Answer to "what's free at this time?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResult {
    pub available: bool,
    pub tables: Vec<RankedTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_slots: Option<Vec<TimeSlot>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    #[serde(with = "hhmm")]
    pub end_time: Minutes,
}

/// Reservation-log record. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RestaurantCreated(Restaurant),
    TableCreated(Table),
    TableAvailabilitySet { id: Ulid, available: bool },
    ReservationCreated(Reservation),
    ReservationUpdated(Reservation),
    ReservationStatusChanged { id: Ulid, status: ReservationStatus },
}
