//! Wall-clock arithmetic on `HH:mm` strings and minutes since midnight.
//!
//! Everything here is restaurant-local. Nothing wraps at midnight: a
//! reservation that starts at 23:00 and lasts three hours ends at minute
//! 1560, rendered as `26:00`, and it is up to the caller to reject it.

use chrono::NaiveDate;

use crate::engine::EngineError;
use crate::limits::MAX_DURATION_MINUTES;
use crate::model::{Minutes, Span};

/// Parse a zero-padded 24-hour `HH:mm` string into minutes since midnight.
pub fn to_minutes(time: &str) -> Result<Minutes, EngineError> {
    let invalid = || EngineError::InvalidFormat {
        field: "time",
        value: time.to_string(),
    };
    let b = time.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return Err(invalid());
    }
    let digit = |c: u8| {
        if c.is_ascii_digit() {
            Ok(Minutes::from(c - b'0'))
        } else {
            Err(invalid())
        }
    };
    let hours = digit(b[0])? * 10 + digit(b[1])?;
    let minutes = digit(b[3])? * 10 + digit(b[4])?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Render minutes since midnight as `HH:mm`. Values past 23:59 are not wrapped.
pub fn to_time(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes.div_euclid(60), minutes.rem_euclid(60))
}

pub fn is_valid_time(time: &str) -> bool {
    to_minutes(time).is_ok()
}

/// Convert a duration in (possibly fractional) hours to whole minutes.
///
/// Durations must be positive and finite. Half-hour multiples always map
/// exactly; anything finer is rounded to the nearest minute.
pub fn hours_to_minutes(hours: f64) -> Result<Minutes, EngineError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(EngineError::InvalidArgument("duration must be positive"));
    }
    let minutes = (hours * 60.0).round();
    if minutes < 1.0 {
        return Err(EngineError::InvalidArgument("duration must be positive"));
    }
    if minutes > MAX_DURATION_MINUTES as f64 {
        return Err(EngineError::LimitExceeded("duration too long"));
    }
    Ok(minutes as Minutes)
}

pub fn add_duration(time: Minutes, hours: f64) -> Result<Minutes, EngineError> {
    Ok(time + hours_to_minutes(hours)?)
}

/// Half-open overlap: `[a_start, a_end)` and `[b_start, b_end)` share an instant.
pub fn overlaps(a_start: Minutes, a_end: Minutes, b_start: Minutes, b_end: Minutes) -> bool {
    a_start < b_end && b_start < a_end
}

/// `open <= time < close`. A reservation may start at opening but not at closing.
pub fn is_within(time: Minutes, open: Minutes, close: Minutes) -> bool {
    open <= time && time < close
}

/// Build the requested interval `[start, start + hours)`.
pub fn request_span(start: Minutes, hours: f64) -> Result<Span, EngineError> {
    let end = add_duration(start, hours)?;
    Ok(Span::new(start, end))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate, EngineError> {
    let invalid = || EngineError::InvalidFormat {
        field: "date",
        value: date.to_string(),
    };
    let b = date.as_bytes();
    let shape_ok = b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if !shape_ok {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())
}

pub fn is_valid_date(date: &str) -> bool {
    parse_date(date).is_ok()
}

/// Candidate start times from `open` (inclusive) to `close` (exclusive) at a
/// fixed step. Cloning restarts the sequence from wherever the clone was taken.
#[derive(Debug, Clone)]
pub struct SlotCandidates {
    next: Minutes,
    close: Minutes,
    step: Minutes,
}

impl Iterator for SlotCandidates {
    type Item = Minutes;

    fn next(&mut self) -> Option<Minutes> {
        if self.next >= self.close {
            return None;
        }
        let current = self.next;
        self.next += self.step;
        Some(current)
    }
}

pub fn slot_candidates(
    open: Minutes,
    close: Minutes,
    granularity: Minutes,
) -> Result<SlotCandidates, EngineError> {
    if granularity <= 0 {
        return Err(EngineError::InvalidArgument("slot granularity must be positive"));
    }
    Ok(SlotCandidates {
        next: open,
        close,
        step: granularity,
    })
}

/// Serde adapter: minutes since midnight as `HH:mm`.
pub mod hhmm {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::Minutes;

    pub fn serialize<S: Serializer>(minutes: &Minutes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_time(*minutes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Minutes, D::Error> {
        let raw = String::deserialize(d)?;
        super::to_minutes(&raw).map_err(serde::de::Error::custom)
    }
}
