use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Counter: per-table availability checks (one per reservation lookup).
pub const AVAILABILITY_CHECKS_TOTAL: &str = "covers_availability_checks_total";

/// Counter: reservation state transitions. Labels: status.
pub const BOOKINGS_TOTAL: &str = "covers_bookings_total";

/// Counter: bookings or reschedules rejected because the table was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "covers_booking_conflicts_total";

/// Histogram: wall time of a day-wide slot search in seconds.
pub const SLOT_SEARCH_DURATION_SECONDS: &str = "covers_slot_search_duration_seconds";

/// Install the Prometheus exporter on `port`. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
