//! Consolidation passes for Engram tiers
//!
//! A pass expires working memory past its TTL, promotes qualifying
//! short-term items into long-term memory, and decays the importance of the
//! short-term items left behind, forgetting never-accessed items that fall
//! below the floor.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ConsolidationConfig;
use crate::memory::scoring::promotion_score;
use crate::memory::tombstone::EvictionReason;
use crate::memory::types::{MemoryId, MemoryItem};
use crate::storage::tier::BoundedTier;

/// Exclusive access to all three tiers for the duration of a pass
pub struct TierSet<'a> {
    pub short_term: &'a mut BoundedTier,
    pub working: &'a mut BoundedTier,
    pub long_term: &'a mut BoundedTier,
}

/// An item removed during a pass
#[derive(Debug, Clone, Serialize)]
pub struct Eviction {
    pub item: MemoryItem,
    pub reason: EvictionReason,
}

/// Result of a consolidation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    /// Items moved from short-term to long-term, in promotion order
    pub promoted: Vec<MemoryId>,
    /// Items removed by expiry, forgetting, or long-term capacity pressure
    pub evictions: Vec<Eviction>,
    /// Number of short-term items whose importance was decayed
    pub decayed: usize,
    /// False when decay was skipped because nothing happened since the last pass
    pub decay_applied: bool,
}

impl ConsolidationReport {
    pub fn count(&self, reason: EvictionReason) -> usize {
        self.evictions.iter().filter(|e| e.reason == reason).count()
    }

    /// True if the pass changed tier membership
    pub fn moved_anything(&self) -> bool {
        !self.promoted.is_empty() || !self.evictions.is_empty()
    }
}

/// Decides promotions, decay and expiry across tiers.
///
/// Decay is applied at most once per activity generation: a pass that
/// observes the same generation as the previous decaying pass leaves
/// importance untouched, so back-to-back passes settle immediately.
#[derive(Debug)]
pub struct ConsolidationEngine {
    config: ConsolidationConfig,
    decayed_at: AtomicU64,
}

impl ConsolidationEngine {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self {
            config,
            decayed_at: AtomicU64::new(u64::MAX),
        }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Run one full pass. `activity` is the store's activity generation.
    pub fn run(&self, tiers: TierSet<'_>, now: DateTime<Utc>, activity: u64) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();

        self.expire_working(tiers.working, now, &mut report);
        self.promote(tiers.short_term, tiers.long_term, &mut report);

        let previous = self.decayed_at.swap(activity, Ordering::AcqRel);
        if previous != activity {
            self.decay_short_term(tiers.short_term, &mut report);
            report.decay_applied = true;
        }

        tracing::info!(
            promoted = report.promoted.len(),
            expired = report.count(EvictionReason::Expired),
            forgotten = report.count(EvictionReason::Forgotten),
            displaced = report.count(EvictionReason::CapacityPressure),
            decayed = report.decayed,
            "Consolidation pass complete"
        );

        report
    }

    /// Short-term items eligible for promotion, best first.
    ///
    /// Ordered by promotion score descending, ties broken by earliest
    /// `created_at`, then lowest id.
    pub fn promotion_candidates(&self, short_term: &BoundedTier) -> Vec<(MemoryId, f32)> {
        let weights = self.config.weights();
        let mut candidates: Vec<(&MemoryItem, f32)> = short_term
            .iter()
            .filter(|m| m.access_count >= self.config.min_promotion_accesses)
            .map(|m| (m, promotion_score(m, &weights)))
            .filter(|(_, score)| *score >= self.config.promotion_threshold)
            .collect();

        candidates.sort_by(|(a, sa), (b, sb)| {
            sb.total_cmp(sa)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        candidates.into_iter().map(|(m, score)| (m.id, score)).collect()
    }

    fn expire_working(
        &self,
        working: &mut BoundedTier,
        now: DateTime<Utc>,
        report: &mut ConsolidationReport,
    ) {
        let ttl = self.config.working_ttl();
        let expired: Vec<MemoryId> = working
            .iter()
            .filter(|m| now - m.created_at > ttl)
            .map(|m| m.id)
            .collect();

        for id in expired {
            if let Some(item) = working.take(id) {
                tracing::debug!(id = %item.id, "Working memory expired");
                report.evictions.push(Eviction {
                    item,
                    reason: EvictionReason::Expired,
                });
            }
        }
    }

    fn promote(
        &self,
        short_term: &mut BoundedTier,
        long_term: &mut BoundedTier,
        report: &mut ConsolidationReport,
    ) {
        for (id, score) in self.promotion_candidates(short_term) {
            let Some(item) = short_term.take(id) else {
                continue;
            };

            match long_term.insert(item) {
                Ok(admitted) => {
                    tracing::debug!(id = %id, score, "Promoted to long-term memory");
                    report.promoted.push(id);
                    if let Some(evicted) = admitted.evicted {
                        report.evictions.push(Eviction {
                            item: evicted,
                            reason: EvictionReason::CapacityPressure,
                        });
                    }
                }
                Err(rejected) => {
                    tracing::warn!(id = %id, %rejected, "Long-term tier refused promotion");
                }
            }
        }
    }

    fn decay_short_term(&self, short_term: &mut BoundedTier, report: &mut ConsolidationReport) {
        let factor = self.config.decay_factor;
        let floor = self.config.forget_floor;
        let mut forgotten = Vec::new();

        for item in short_term.iter_mut() {
            item.set_importance(item.importance * factor);
            report.decayed += 1;
            if item.importance < floor && item.access_count == 0 {
                forgotten.push(item.id);
            }
        }

        // Stable order keeps reports reproducible
        forgotten.sort();
        for id in forgotten {
            if let Some(item) = short_term.take(id) {
                tracing::debug!(id = %item.id, importance = item.importance, "Forgot memory");
                report.evictions.push(Eviction {
                    item,
                    reason: EvictionReason::Forgotten,
                });
            }
        }
    }
}

impl Default for ConsolidationEngine {
    fn default() -> Self {
        Self::new(ConsolidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{Content, Tier};
    use chrono::Duration;
    use std::num::NonZeroUsize;

    struct Tiers {
        short_term: BoundedTier,
        working: BoundedTier,
        long_term: BoundedTier,
    }

    impl Tiers {
        fn new(short: usize, working: usize, long: usize) -> Self {
            Self {
                short_term: BoundedTier::new(Tier::ShortTerm, NonZeroUsize::new(short).unwrap()),
                working: BoundedTier::new(Tier::Working, NonZeroUsize::new(working).unwrap()),
                long_term: BoundedTier::new(Tier::LongTerm, NonZeroUsize::new(long).unwrap()),
            }
        }

        fn set(&mut self) -> TierSet<'_> {
            TierSet {
                short_term: &mut self.short_term,
                working: &mut self.working,
                long_term: &mut self.long_term,
            }
        }
    }

    fn item(id: u64, importance: f32, access_count: u32, now: DateTime<Utc>) -> MemoryItem {
        let mut item = MemoryItem::new(
            MemoryId(id),
            Content::new(format!("memory {id}")),
            importance,
            Tier::ShortTerm,
            now,
        );
        item.access_count = access_count;
        item
    }

    #[test]
    fn test_custom_decay_applies() {
        let now = Utc::now();
        let engine = ConsolidationEngine::new(ConsolidationConfig::default().with_decay(0.5, 0.3));
        let mut tiers = Tiers::new(5, 5, 5);
        tiers.short_term.insert(item(1, 0.5, 0, now)).unwrap();
        tiers.short_term.insert(item(2, 0.8, 0, now)).unwrap();

        let report = engine.run(tiers.set(), now, 0);
        assert_eq!(report.count(EvictionReason::Forgotten), 1);
        assert_eq!(report.evictions[0].item.id, MemoryId(1));
        assert_eq!(tiers.short_term.peek(MemoryId(2)).unwrap().importance, 0.4);
    }

    mod promotion {
        use super::*;

        #[test]
        fn test_promotes_in_descending_score_order() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.short_term.insert(item(1, 0.9, 3, now)).unwrap();
            tiers.short_term.insert(item(2, 1.0, 3, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);

            assert_eq!(report.promoted, vec![MemoryId(2), MemoryId(1)]);
            assert!(tiers.short_term.is_empty());
            assert_eq!(tiers.long_term.len(), 2);
            assert_eq!(tiers.long_term.peek(MemoryId(1)).unwrap().tier, Tier::LongTerm);
        }

        #[test]
        fn test_requires_minimum_accesses() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            // score = 0.6 + 0.4 * 0.2 = 0.68 < 0.75 and only one access
            tiers.short_term.insert(item(1, 1.0, 1, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);
            assert!(report.promoted.is_empty());
            assert_eq!(tiers.short_term.len(), 1);
        }

        #[test]
        fn test_requires_threshold_score() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            // score = 0.3 * 0.6 + 1.0 * 0.4 = 0.58
            tiers.short_term.insert(item(1, 0.3, 10, now)).unwrap();

            assert!(engine.promotion_candidates(&tiers.short_term).is_empty());
        }

        #[test]
        fn test_score_ties_prefer_earliest_created() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers
                .short_term
                .insert(item(2, 0.9, 5, now + Duration::seconds(1)))
                .unwrap();
            tiers.short_term.insert(item(1, 0.9, 5, now)).unwrap();

            let ids: Vec<MemoryId> = engine
                .promotion_candidates(&tiers.short_term)
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            assert_eq!(ids, vec![MemoryId(1), MemoryId(2)]);
        }

        #[test]
        fn test_promotion_can_evict_from_long_term() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 1);
            let mut resident = item(10, 0.2, 0, now);
            resident.tier = Tier::LongTerm;
            tiers.long_term.insert(resident).unwrap();
            tiers.short_term.insert(item(1, 0.9, 3, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);

            assert_eq!(report.promoted, vec![MemoryId(1)]);
            assert_eq!(report.count(EvictionReason::CapacityPressure), 1);
            assert_eq!(report.evictions[0].item.id, MemoryId(10));
            assert_eq!(tiers.long_term.len(), 1);
        }
    }

    mod decay {
        use super::*;

        #[test]
        fn test_unpromoted_items_decay() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.short_term.insert(item(1, 0.5, 1, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);
            assert!(report.decay_applied);
            assert_eq!(report.decayed, 1);
            let importance = tiers.short_term.peek(MemoryId(1)).unwrap().importance;
            assert!((importance - 0.475).abs() < 1e-6);
        }

        #[test]
        fn test_never_accessed_items_below_floor_are_forgotten() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.short_term.insert(item(1, 0.05, 0, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);
            assert_eq!(report.count(EvictionReason::Forgotten), 1);
            let forgotten = &report.evictions[0].item;
            assert!((forgotten.importance - 0.0475).abs() < 1e-6);
            assert!(tiers.short_term.is_empty());
        }

        #[test]
        fn test_accessed_items_below_floor_are_kept() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.short_term.insert(item(1, 0.05, 1, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);
            assert_eq!(report.count(EvictionReason::Forgotten), 0);
            assert_eq!(tiers.short_term.len(), 1);
        }

        #[test]
        fn test_decay_skipped_without_new_activity() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.short_term.insert(item(1, 0.5, 1, now)).unwrap();

            engine.run(tiers.set(), now, 7);
            let second = engine.run(tiers.set(), now, 7);
            assert!(!second.decay_applied);
            assert_eq!(second.decayed, 0);

            let third = engine.run(tiers.set(), now, 8);
            assert!(third.decay_applied);
            let importance = tiers.short_term.peek(MemoryId(1)).unwrap().importance;
            assert!((importance - 0.5 * 0.95 * 0.95).abs() < 1e-6);
        }

        #[test]
        fn test_long_term_is_not_decayed() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.long_term.insert(item(1, 0.5, 0, now)).unwrap();

            engine.run(tiers.set(), now, 0);
            assert_eq!(tiers.long_term.peek(MemoryId(1)).unwrap().importance, 0.5);
        }
    }

    mod expiry {
        use super::*;

        #[test]
        fn test_working_items_past_ttl_expire() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers
                .working
                .insert(item(1, 1.0, 9, now - Duration::seconds(301)))
                .unwrap();
            tiers
                .working
                .insert(item(2, 0.1, 0, now - Duration::seconds(300)))
                .unwrap();

            let report = engine.run(tiers.set(), now, 0);

            assert_eq!(report.count(EvictionReason::Expired), 1);
            assert_eq!(report.evictions[0].item.id, MemoryId(1));
            assert!(tiers.working.contains(MemoryId(2)));
        }

        #[test]
        fn test_working_memory_never_promotes() {
            let now = Utc::now();
            let engine = ConsolidationEngine::default();
            let mut tiers = Tiers::new(5, 5, 5);
            tiers.working.insert(item(1, 1.0, 10, now)).unwrap();

            let report = engine.run(tiers.set(), now, 0);
            assert!(report.promoted.is_empty());
            assert!(tiers.working.contains(MemoryId(1)));
            assert_eq!(tiers.working.peek(MemoryId(1)).unwrap().importance, 1.0);
        }
    }

    #[test]
    fn test_second_pass_without_activity_changes_nothing() {
        let now = Utc::now();
        let engine = ConsolidationEngine::default();
        let mut tiers = Tiers::new(5, 5, 5);
        tiers.short_term.insert(item(1, 0.9, 3, now)).unwrap();
        tiers.short_term.insert(item(2, 0.0526, 0, now)).unwrap();
        tiers.short_term.insert(item(3, 0.4, 1, now)).unwrap();

        engine.run(tiers.set(), now, 1);
        let snapshot: Vec<(u64, f32)> = tiers
            .short_term
            .iter()
            .map(|m| (m.id.0, m.importance))
            .collect();

        let second = engine.run(tiers.set(), now, 1);
        assert!(!second.moved_anything());
        let after: Vec<(u64, f32)> = tiers
            .short_term
            .iter()
            .map(|m| (m.id.0, m.importance))
            .collect();
        assert_eq!(snapshot, after);
    }
}
