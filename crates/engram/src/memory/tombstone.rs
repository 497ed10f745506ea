//! Tombstone records for evicted memories
//!
//! Every eviction leaves a small record behind so collaborators can tell
//! "never stored" apart from "stored, then forgotten".

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::types::{MemoryId, MemoryItem, Tier};

/// A record of an evicted memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Identifier of the item that was evicted
    pub original_id: MemoryId,
    /// Tier the item was evicted from
    pub tier: Tier,
    /// Why the item was evicted
    pub reason: EvictionReason,
    /// Importance at the time of eviction
    pub importance: f32,
    /// Access count at the time of eviction
    pub access_count: u32,
    /// When the original item was created
    pub approximate_date: DateTime<Utc>,
    /// When the eviction happened
    pub evicted_at: DateTime<Utc>,
}

/// Reasons an item may leave the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Displaced to keep a full tier within capacity
    CapacityPressure,
    /// Decayed below the importance floor without ever being accessed
    Forgotten,
    /// Working-memory item outlived its time-to-live
    Expired,
}

impl EvictionReason {
    pub const ALL: [EvictionReason; 3] = [
        EvictionReason::CapacityPressure,
        EvictionReason::Forgotten,
        EvictionReason::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::CapacityPressure => "capacity_pressure",
            EvictionReason::Forgotten => "forgotten",
            EvictionReason::Expired => "expired",
        }
    }
}

impl Tombstone {
    pub fn new(item: &MemoryItem, reason: EvictionReason, evicted_at: DateTime<Utc>) -> Self {
        Self {
            original_id: item.id,
            tier: item.tier,
            reason,
            importance: item.importance,
            access_count: item.access_count,
            approximate_date: item.created_at,
            evicted_at,
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EvictionReason::CapacityPressure => "capacity pressure",
            EvictionReason::Forgotten => "forgetting",
            EvictionReason::Expired => "expiry",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Tombstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory {} from {} ({}) was evicted from {} due to {}.",
            self.original_id,
            self.approximate_date.format("%Y-%m-%d %H:%M"),
            format_args!("importance {:.2}, {} accesses", self.importance, self.access_count),
            self.tier,
            self.reason
        )
    }
}
