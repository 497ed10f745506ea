//! Time sources for memory timestamps

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of wall-clock time for the store.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wraps a [`Clock`] so readings never go backwards.
///
/// System time can step back (NTP adjustments); eviction order and TTLs
/// rely on `created_at` and `last_accessed_at` being non-decreasing.
pub struct MonotonicClock {
    inner: Arc<dyn Clock>,
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub fn new(inner: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            last_micros: AtomicI64::new(i64::MIN),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let reading = self.inner.now();
        let micros = reading.timestamp_micros();
        let previous = self.last_micros.fetch_max(micros, Ordering::AcqRel);
        if previous > micros {
            DateTime::from_timestamp_micros(previous).unwrap_or(reading)
        } else {
            reading
        }
    }
}

impl std::fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("last_micros", &self.last_micros.load(Ordering::Relaxed))
            .finish()
    }
}
