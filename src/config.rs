use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::{DEFAULT_ALTERNATIVES, DEFAULT_DURATION_HOURS, DEFAULT_SLOT_GRANULARITY};
use crate::model::Minutes;

/// Process configuration, read from `COVERS_*` environment variables.
/// Unset or unparseable values fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub slot_granularity: Minutes,
    pub default_duration_hours: f64,
    pub alternatives: usize,
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            slot_granularity: DEFAULT_SLOT_GRANULARITY,
            default_duration_hours: DEFAULT_DURATION_HOURS,
            alternatives: DEFAULT_ALTERNATIVES,
            compact_threshold: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        let defaults = Self::default();
        Self {
            data_dir: lookup("COVERS_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            metrics_port: parsed(&lookup, "COVERS_METRICS_PORT"),
            slot_granularity: parsed(&lookup, "COVERS_SLOT_GRANULARITY")
                .filter(|m: &Minutes| *m > 0)
                .unwrap_or(defaults.slot_granularity),
            default_duration_hours: parsed(&lookup, "COVERS_DEFAULT_DURATION")
                .filter(|h: &f64| h.is_finite() && *h > 0.0)
                .unwrap_or(defaults.default_duration_hours),
            alternatives: parsed(&lookup, "COVERS_ALTERNATIVES")
                .map(|n: usize| n.min(crate::limits::MAX_ALTERNATIVES))
                .unwrap_or(defaults.alternatives),
            compact_threshold: parsed(&lookup, "COVERS_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("reservations.log")
    }
}
