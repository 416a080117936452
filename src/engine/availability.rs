use std::time::Instant;

use chrono::NaiveDate;
use tracing::debug;
use ulid::Ulid;

use crate::model::*;
use crate::time::{parse_date, request_span, slot_candidates, to_minutes};

use super::{Engine, EngineError, DEFAULT_SLOT_GRANULARITY};

// ── Conflict detection ────────────────────────────────────────────

/// First active reservation whose interval overlaps `span`, skipping `exclude`.
///
/// Inactive records are ignored even if the source returned them.
pub fn find_conflict<'a>(
    reservations: &'a [Reservation],
    span: &Span,
    exclude: Option<Ulid>,
) -> Result<Option<&'a Reservation>, EngineError> {
    for r in reservations {
        if !r.status.is_active() || Some(r.id) == exclude {
            continue;
        }
        if r.duration_minutes <= 0 {
            return Err(EngineError::InvalidArgument("stored reservation has no duration"));
        }
        if Span::new(r.start, r.end()).overlaps(span) {
            return Ok(Some(r));
        }
    }
    Ok(None)
}

/// Slots closest to `requested`, excluding `requested` itself.
///
/// Sorting is stable, so equidistant slots keep chronological order (the
/// earlier one wins).
pub fn nearest_slots(mut slots: Vec<TimeSlot>, requested: Minutes, limit: usize) -> Vec<TimeSlot> {
    slots.retain(|s| s.time != requested);
    slots.sort_by_key(|s| (s.time - requested).abs());
    slots.truncate(limit);
    slots
}

// ── Slot search parameters ────────────────────────────────────────

/// Parameters for a day-wide slot search.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotQuery {
    pub restaurant_id: Ulid,
    pub date: NaiveDate,
    pub hours: Span,
    pub party_size: u32,
    pub duration_hours: f64,
    pub granularity: Minutes,
}

impl SlotQuery {
    pub fn new(
        restaurant_id: Ulid,
        open: &str,
        close: &str,
        date: &str,
        party_size: u32,
        duration_hours: f64,
    ) -> Result<Self, EngineError> {
        let open = to_minutes(open)?;
        let close = to_minutes(close)?;
        if open >= close {
            return Err(EngineError::InvalidArgument("opening time must be before closing time"));
        }
        Self::build(restaurant_id, Span::new(open, close), parse_date(date)?, party_size, duration_hours)
    }

    pub fn for_restaurant(
        restaurant: &Restaurant,
        date: &str,
        party_size: u32,
        duration_hours: f64,
    ) -> Result<Self, EngineError> {
        Self::build(restaurant.id, restaurant.hours(), parse_date(date)?, party_size, duration_hours)
    }

    fn build(
        restaurant_id: Ulid,
        hours: Span,
        date: NaiveDate,
        party_size: u32,
        duration_hours: f64,
    ) -> Result<Self, EngineError> {
        if party_size == 0 {
            return Err(EngineError::InvalidArgument("party size must be positive"));
        }
        // Validate up front so a bad duration fails even when no slot survives.
        request_span(hours.start, duration_hours)?;
        Ok(Self {
            restaurant_id,
            date,
            hours,
            party_size,
            duration_hours,
            granularity: DEFAULT_SLOT_GRANULARITY,
        })
    }

    pub fn with_granularity(mut self, minutes: Minutes) -> Self {
        self.granularity = minutes;
        self
    }
}

// ── Engine queries ────────────────────────────────────────────────

impl Engine {
    /// Is `table_id` free for `[start, start + duration_hours)` on `date`?
    pub async fn is_available(
        &self,
        table_id: Ulid,
        date: &str,
        start: &str,
        duration_hours: f64,
    ) -> Result<bool, EngineError> {
        let date = parse_date(date)?;
        let span = request_span(to_minutes(start)?, duration_hours)?;
        Ok(self.conflict_at(table_id, date, &span, None).await?.is_none())
    }

    /// The single place where reservations are compared against a request.
    pub(super) async fn conflict_at(
        &self,
        table_id: Ulid,
        date: NaiveDate,
        span: &Span,
        exclude: Option<Ulid>,
    ) -> Result<Option<Reservation>, EngineError> {
        metrics::counter!(crate::observability::AVAILABILITY_CHECKS_TOTAL).increment(1);
        let reservations = self.store.fetch_active_reservations(table_id, date).await?;
        let conflict = find_conflict(&reservations, span, exclude)?.cloned();
        debug!(
            %table_id,
            %date,
            start = span.start,
            end = span.end,
            free = conflict.is_none(),
            "availability check"
        );
        Ok(conflict)
    }

    pub async fn available_tables(
        &self,
        restaurant_id: Ulid,
        date: &str,
        start: &str,
        duration_hours: f64,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Table>, EngineError> {
        let date = parse_date(date)?;
        let span = request_span(to_minutes(start)?, duration_hours)?;
        self.available_tables_at(restaurant_id, date, &span, min_capacity)
            .await
    }

    pub(super) async fn available_tables_at(
        &self,
        restaurant_id: Ulid,
        date: NaiveDate,
        span: &Span,
        min_capacity: Option<u32>,
    ) -> Result<Vec<Table>, EngineError> {
        if min_capacity == Some(0) {
            return Err(EngineError::InvalidArgument("minimum capacity must be positive"));
        }
        let tables = self.store.fetch_tables(restaurant_id, min_capacity).await?;
        let mut free = Vec::with_capacity(tables.len());
        for table in tables {
            if self.conflict_at(table.id, date, span, None).await?.is_none() {
                free.push(table);
            }
        }
        Ok(free)
    }

    /// Every start time in operating hours at which at least one table fits
    /// the party for the whole duration, in chronological order.
    pub async fn time_slots(&self, query: &SlotQuery) -> Result<Vec<TimeSlot>, EngineError> {
        let started = Instant::now();
        let mut slots = Vec::new();

        for candidate in slot_candidates(query.hours.start, query.hours.end, query.granularity)? {
            let span = request_span(candidate, query.duration_hours)?;
            // Must finish by closing; later candidates only end later.
            if span.end > query.hours.end {
                break;
            }
            let free = self
                .available_tables_at(query.restaurant_id, query.date, &span, Some(query.party_size))
                .await?;
            if !free.is_empty() {
                slots.push(TimeSlot {
                    time: candidate,
                    available_tables: free.len(),
                });
            }
        }

        metrics::histogram!(crate::observability::SLOT_SEARCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(slots)
    }

    /// Up to `limit` free slots nearest to `requested_time`. Advisory only:
    /// nothing is held, so a suggestion may be taken before it is booked.
    pub async fn alternative_slots(
        &self,
        query: &SlotQuery,
        requested_time: &str,
        limit: usize,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        let requested = to_minutes(requested_time)?;
        let slots = self.time_slots(query).await?;
        Ok(nearest_slots(slots, requested, limit))
    }
}
