//! Test helpers: a controllable clock and item builders

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::memory::types::{Content, MemoryId, MemoryItem, Tier};

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn rewind(&self, by: Duration) {
        *self.now.lock() -= by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    /// Starts at 2024-01-01T00:00:00Z
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A short-term item with the given id and importance
pub fn item(id: u64, content: &str, importance: f32, now: DateTime<Utc>) -> MemoryItem {
    MemoryItem::new(MemoryId(id), Content::new(content), importance, Tier::ShortTerm, now)
}

/// An item that has already been retrieved `access_count` times
pub fn accessed_item(
    id: u64,
    content: &str,
    importance: f32,
    access_count: u32,
    now: DateTime<Utc>,
) -> MemoryItem {
    let mut item = item(id, content, importance, now);
    item.access_count = access_count;
    item
}
