//! Read-only statistics for monitoring collaborators

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::memory::tombstone::EvictionReason;
use crate::memory::types::Tier;
use crate::storage::tier::BoundedTier;

/// Occupancy and access figures for one tier
#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub tier: Tier,
    pub count: usize,
    pub capacity: usize,
    /// Sum of `access_count` over resident items
    pub total_accesses: u64,
    /// Mean importance of resident items (0.0 when empty)
    pub mean_importance: f32,
}

impl TierStats {
    pub fn of(tier: &BoundedTier) -> Self {
        let (total_accesses, importance_sum) = tier.iter().fold((0u64, 0f64), |(acc, imp), m| {
            (acc + u64::from(m.access_count), imp + f64::from(m.importance))
        });
        let count = tier.len();
        let mean_importance = if count == 0 {
            0.0
        } else {
            (importance_sum / count as f64) as f32
        };

        Self {
            tier: tier.tier(),
            count,
            capacity: tier.capacity(),
            total_accesses,
            mean_importance,
        }
    }

    /// Fraction of capacity in use
    pub fn utilization(&self) -> f32 {
        self.count as f32 / self.capacity.max(1) as f32
    }
}

/// Lifetime eviction counts by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionCounts {
    pub capacity_pressure: u64,
    pub forgotten: u64,
    pub expired: u64,
}

impl EvictionCounts {
    pub fn get(&self, reason: EvictionReason) -> u64 {
        match reason {
            EvictionReason::CapacityPressure => self.capacity_pressure,
            EvictionReason::Forgotten => self.forgotten,
            EvictionReason::Expired => self.expired,
        }
    }

    pub fn total(&self) -> u64 {
        self.capacity_pressure + self.forgotten + self.expired
    }
}

/// Snapshot returned by [`MemoryStore::stats`](crate::storage::MemoryStore::stats).
///
/// Tiers are read one at a time, so the per-tier figures are each
/// consistent but not taken at a single instant.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub tiers: Vec<TierStats>,
    pub total_items: usize,
    pub total_accesses: u64,
    pub stores: u64,
    pub rejected_stores: u64,
    pub retrievals: u64,
    pub promotions: u64,
    pub evictions: EvictionCounts,
    pub consolidation_passes: u64,
}

impl StoreStats {
    pub fn tier(&self, tier: Tier) -> Option<&TierStats> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Lock-free lifetime counters
#[derive(Debug, Default)]
pub(crate) struct Counters {
    stores: AtomicU64,
    rejected_stores: AtomicU64,
    retrievals: AtomicU64,
    promotions: AtomicU64,
    capacity_pressure: AtomicU64,
    forgotten: AtomicU64,
    expired: AtomicU64,
    consolidation_passes: AtomicU64,
}

impl Counters {
    pub(crate) fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pass(&self, promotions: usize) {
        self.consolidation_passes.fetch_add(1, Ordering::Relaxed);
        self.promotions
            .fetch_add(promotions as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, reason: EvictionReason) {
        let counter = match reason {
            EvictionReason::CapacityPressure => &self.capacity_pressure,
            EvictionReason::Forgotten => &self.forgotten,
            EvictionReason::Expired => &self.expired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, tiers: Vec<TierStats>) -> StoreStats {
        let total_items = tiers.iter().map(|t| t.count).sum();
        let total_accesses = tiers.iter().map(|t| t.total_accesses).sum();
        StoreStats {
            tiers,
            total_items,
            total_accesses,
            stores: self.stores.load(Ordering::Relaxed),
            rejected_stores: self.rejected_stores.load(Ordering::Relaxed),
            retrievals: self.retrievals.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: EvictionCounts {
                capacity_pressure: self.capacity_pressure.load(Ordering::Relaxed),
                forgotten: self.forgotten.load(Ordering::Relaxed),
                expired: self.expired.load(Ordering::Relaxed),
            },
            consolidation_passes: self.consolidation_passes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{Content, MemoryId, MemoryItem};
    use chrono::Utc;
    use std::num::NonZeroUsize;

    #[test]
    fn test_tier_stats_empty() {
        let tier = BoundedTier::new(Tier::Working, NonZeroUsize::new(4).unwrap());
        let stats = TierStats::of(&tier);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.mean_importance, 0.0);
        assert_eq!(stats.utilization(), 0.0);
    }

    #[test]
    fn test_tier_stats_aggregates() {
        let now = Utc::now();
        let mut tier = BoundedTier::new(Tier::LongTerm, NonZeroUsize::new(4).unwrap());
        for (id, importance, accesses) in [(1, 0.2, 1), (2, 0.6, 3)] {
            let mut item =
                MemoryItem::new(MemoryId(id), Content::new("x"), importance, Tier::LongTerm, now);
            item.access_count = accesses;
            tier.insert(item).unwrap();
        }

        let stats = TierStats::of(&tier);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_accesses, 4);
        assert!((stats.mean_importance - 0.4).abs() < 1e-6);
        assert_eq!(stats.utilization(), 0.5);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        counters.record_store();
        counters.record_store();
        counters.record_rejected();
        counters.record_pass(3);
        counters.record_eviction(EvictionReason::Expired);
        counters.record_eviction(EvictionReason::Forgotten);

        let stats = counters.snapshot(Vec::new());
        assert_eq!(stats.stores, 2);
        assert_eq!(stats.rejected_stores, 1);
        assert_eq!(stats.promotions, 3);
        assert_eq!(stats.consolidation_passes, 1);
        assert_eq!(stats.evictions.total(), 2);
        assert_eq!(stats.evictions.get(EvictionReason::Expired), 1);
    }
}
