//! Restaurant table reservations: an availability and conflict-resolution
//! engine over half-open wall-clock intervals, with table ranking, a
//! log-backed reference store, and mocked customer notifications.

pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;
pub mod time;
pub mod wal;

pub use engine::{BookingRequest, Engine, EngineError, ReservationUpdate, SlotQuery, StoreError};
pub use model::{Reservation, ReservationStatus, Restaurant, Table, TimeSlot};
pub use store::InMemoryStore;
