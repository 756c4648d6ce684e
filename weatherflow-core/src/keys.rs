//! Object key naming and the process-wide key clock.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::{
    OnceLock,
    atomic::{AtomicI64, Ordering},
};

use crate::store::Namespace;

/// Stamp format embedded in keys.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Hands out second-granularity stamps that never repeat within a process.
///
/// A capture time in the same second as (or earlier than) the last issued stamp
/// is moved to one second after it.
#[derive(Debug)]
pub struct KeyClock {
    last: AtomicI64,
}

impl KeyClock {
    pub fn new() -> Self {
        Self { last: AtomicI64::new(i64::MIN) }
    }

    /// Clock shared by every writer in the process.
    pub fn global() -> &'static KeyClock {
        static CLOCK: OnceLock<KeyClock> = OnceLock::new();
        CLOCK.get_or_init(KeyClock::new)
    }

    pub fn stamp(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let wanted = at.timestamp();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = if wanted > prev { wanted } else { prev + 1 };
            match self.last.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Utc.timestamp_opt(next, 0).single().unwrap_or(at),
                Err(actual) => prev = actual,
            }
        }
    }
}

impl Default for KeyClock {
    fn default() -> Self {
        Self::new()
    }
}

/// `raw/weather_data_<stamp>.json`
pub fn raw_key(stamp: DateTime<Utc>) -> String {
    format!("{}weather_data_{}.json", Namespace::Raw.prefix(), stamp.format(STAMP_FORMAT))
}

/// `transformed/weather_data_transformed_<stamp>.<extension>`
pub fn transformed_key(stamp: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}weather_data_transformed_{}.{}",
        Namespace::Transformed.prefix(),
        stamp.format(STAMP_FORMAT),
        extension
    )
}
