//! The public memory store
//!
//! `MemoryStore` composes the three tiers and the consolidation engine.
//! Each tier sits behind its own `RwLock`; `store` takes one tier's write
//! lock, `retrieve` takes read locks to rank and short write locks to record
//! access, and `consolidate` write-locks all three in [`Tier::LOCK_ORDER`].

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::clock::{Clock, MonotonicClock, SystemClock};
use crate::config::Config;
use crate::error::{EngramError, Rejected, Result};
use crate::memory::scoring::relevance;
use crate::memory::tombstone::{EvictionReason, Tombstone};
use crate::memory::types::{Content, MemoryId, MemoryItem, Tier, tokenize};
use crate::storage::consolidation::{ConsolidationEngine, ConsolidationReport, TierSet};
use crate::storage::filter::MemoryFilter;
use crate::storage::retrieval::{RetrievedMemory, merge_ranked};
use crate::storage::stats::{Counters, StoreStats, TierStats};
use crate::storage::tier::BoundedTier;

/// Parameters for [`MemoryStore::store_with`]
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub content: Content,
    pub importance: f32,
    pub tier: Tier,
    pub tags: Vec<String>,
}

impl StoreRequest {
    /// A short-term store request with no tags
    pub fn new(content: impl Into<Content>, importance: f32) -> Self {
        Self {
            content: content.into(),
            importance,
            tier: Tier::ShortTerm,
            tags: Vec::new(),
        }
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Bounded, tiered memory store shared by concurrent callers.
pub struct MemoryStore {
    short_term: RwLock<BoundedTier>,
    working: RwLock<BoundedTier>,
    long_term: RwLock<BoundedTier>,
    engine: ConsolidationEngine,
    consolidate_on_pressure: bool,
    next_id: AtomicU64,
    /// Bumped by every successful store and every non-empty retrieval
    activity: AtomicU64,
    clock: MonotonicClock,
    tombstones: Mutex<LruCache<MemoryId, Tombstone>>,
    counters: Counters,
}

impl MemoryStore {
    /// Create a store using the system clock
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store reading time from `clock`
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let tiers = &config.tiers;
        let tombstone_capacity = NonZeroUsize::new(config.tombstones.capacity)
            .ok_or_else(|| EngramError::Config("tombstones.capacity must be positive".into()))?;

        tracing::debug!(
            short_term = tiers.short_term_capacity,
            working = tiers.working_capacity,
            long_term = tiers.long_term_capacity,
            "Creating memory store"
        );

        Ok(Self {
            short_term: RwLock::new(BoundedTier::new(
                Tier::ShortTerm,
                tiers.capacity(Tier::ShortTerm)?,
            )),
            working: RwLock::new(BoundedTier::new(Tier::Working, tiers.capacity(Tier::Working)?)),
            long_term: RwLock::new(BoundedTier::new(
                Tier::LongTerm,
                tiers.capacity(Tier::LongTerm)?,
            )),
            engine: ConsolidationEngine::new(config.consolidation),
            consolidate_on_pressure: config.consolidation.consolidate_on_pressure,
            next_id: AtomicU64::new(1),
            activity: AtomicU64::new(0),
            clock: MonotonicClock::new(clock),
            tombstones: Mutex::new(LruCache::new(tombstone_capacity)),
            counters: Counters::default(),
        })
    }

    fn tier(&self, tier: Tier) -> &RwLock<BoundedTier> {
        match tier {
            Tier::ShortTerm => &self.short_term,
            Tier::Working => &self.working,
            Tier::LongTerm => &self.long_term,
        }
    }

    /// Store content in `tier`, returning its new id.
    ///
    /// Fails with [`EngramError::InvalidImportance`] when importance is
    /// outside [0, 1] and with [`EngramError::StoreFailed`] when the content
    /// has no tokens. A failed store consumes no id and changes nothing.
    pub fn store(&self, content: impl Into<Content>, importance: f32, tier: Tier) -> Result<MemoryId> {
        self.store_with(StoreRequest::new(content, importance).tier(tier))
    }

    pub fn store_with(&self, request: StoreRequest) -> Result<MemoryId> {
        let StoreRequest {
            content,
            importance,
            tier,
            tags,
        } = request;

        if !(0.0..=1.0).contains(&importance) {
            self.counters.record_rejected();
            tracing::warn!(importance, "Rejected store: importance out of range");
            return Err(EngramError::InvalidImportance(importance));
        }
        if content.is_empty() {
            self.counters.record_rejected();
            tracing::warn!(%tier, "Rejected store: empty content");
            return Err(Rejected::empty_content().into());
        }

        if self.consolidate_on_pressure && tier == Tier::ShortTerm && self.short_term.read().is_full()
        {
            tracing::debug!("Short-term tier full, consolidating before store");
            self.consolidate();
        }

        let id = MemoryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = self.clock.now();
        let item = MemoryItem::new(id, content, importance, tier, now).with_tags(tags);

        let admitted = self.tier(tier).write().insert(item)?;
        if let Some(evicted) = admitted.evicted {
            self.bury(&evicted, EvictionReason::CapacityPressure, now);
        }

        self.counters.record_store();
        self.activity.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(id = %id, %tier, importance, "Stored memory");
        Ok(id)
    }

    /// Rank memories across all tiers against `query`.
    ///
    /// Returns at most `limit` items, most relevant first; an empty result
    /// is not an error. Every returned item has its access count incremented.
    pub fn retrieve(&self, query: &str, limit: usize) -> Vec<RetrievedMemory> {
        self.retrieve_filtered(query, &MemoryFilter::default(), limit)
    }

    pub fn retrieve_filtered(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Vec<RetrievedMemory> {
        self.counters.record_retrieval();

        let query_tokens = tokenize(query);
        if limit == 0 || query_tokens.is_empty() {
            return Vec::new();
        }

        let per_tier: Vec<Vec<RetrievedMemory>> = Tier::ALL
            .into_iter()
            .filter(|tier| filter.includes_tier(*tier))
            .map(|tier| {
                let guard = self.tier(tier).read();
                guard
                    .scan(|m| {
                        if filter.matches(m) {
                            relevance(&query_tokens, m)
                        } else {
                            None
                        }
                    })
                    .take(limit)
                    .collect()
            })
            .collect();

        let ranked = merge_ranked(per_tier, limit);
        if ranked.is_empty() {
            return ranked;
        }

        let now = self.clock.now();
        let results: Vec<RetrievedMemory> = ranked
            .into_iter()
            .filter_map(|hit| {
                self.touch(hit.memory.id, hit.memory.tier, now)
                    .map(|memory| RetrievedMemory {
                        memory,
                        relevance: hit.relevance,
                    })
            })
            .collect();

        if !results.is_empty() {
            self.activity.fetch_add(1, Ordering::AcqRel);
        }
        tracing::debug!(query, returned = results.len(), "Retrieved memories");
        results
    }

    /// Record an access, looking in `hint` first in case the item moved.
    fn touch(&self, id: MemoryId, hint: Tier, now: DateTime<Utc>) -> Option<MemoryItem> {
        std::iter::once(hint)
            .chain(Tier::ALL.into_iter().filter(|t| *t != hint))
            .find_map(|tier| self.tier(tier).write().get(id, now).cloned())
    }

    /// Run a full consolidation pass.
    pub fn consolidate(&self) -> ConsolidationReport {
        let report = {
            // Tier::LOCK_ORDER
            let mut long_term = self.long_term.write();
            let mut short_term = self.short_term.write();
            let mut working = self.working.write();

            let now = self.clock.now();
            let activity = self.activity.load(Ordering::Acquire);
            self.engine.run(
                TierSet {
                    short_term: &mut *short_term,
                    working: &mut *working,
                    long_term: &mut *long_term,
                },
                now,
                activity,
            )
        };

        let now = self.clock.now();
        for eviction in &report.evictions {
            self.bury(&eviction.item, eviction.reason, now);
        }
        self.counters.record_pass(report.promoted.len());
        report
    }

    /// Per-tier counts and lifetime counters
    pub fn stats(&self) -> StoreStats {
        let tiers = Tier::ALL
            .into_iter()
            .map(|tier| TierStats::of(&self.tier(tier).read()))
            .collect();
        self.counters.snapshot(tiers)
    }

    /// Copy of a resident item, without recording an access
    pub fn peek(&self, id: MemoryId) -> Option<MemoryItem> {
        Tier::ALL
            .into_iter()
            .find_map(|tier| self.tier(tier).read().peek(id).cloned())
    }

    /// Residents of a tier, oldest arrival first
    pub fn contents(&self, tier: Tier) -> Vec<MemoryItem> {
        self.tier(tier).read().iter().cloned().collect()
    }

    pub fn len(&self, tier: Tier) -> usize {
        self.tier(tier).read().len()
    }

    pub fn capacity(&self, tier: Tier) -> usize {
        self.tier(tier).read().capacity()
    }

    pub fn total_len(&self) -> usize {
        Tier::ALL.into_iter().map(|tier| self.len(tier)).sum()
    }

    /// Scale one item's importance by `factor` (clamped to [0, 1]).
    ///
    /// Returns the new importance, or `None` if the id is not resident.
    pub fn reinforce(&self, id: MemoryId, factor: f32) -> Result<Option<f32>> {
        check_factor(factor)?;
        Ok(Tier::ALL.into_iter().find_map(|tier| {
            self.tier(tier)
                .write()
                .adjust_importance(id, |importance| importance * factor)
        }))
    }

    /// Scale the importance of the `count` most recent arrivals in `tier`.
    ///
    /// Returns how many items were adjusted.
    pub fn reinforce_recent(&self, tier: Tier, count: usize, factor: f32) -> Result<usize> {
        check_factor(factor)?;
        let mut guard = self.tier(tier).write();
        let adjusted = guard
            .most_recent(count)
            .into_iter()
            .filter_map(|id| guard.adjust_importance(id, |importance| importance * factor))
            .count();
        tracing::debug!(%tier, adjusted, factor, "Reinforced recent memories");
        Ok(adjusted)
    }

    /// Eviction record for an id, if it is still retained
    pub fn tombstone(&self, id: MemoryId) -> Option<Tombstone> {
        self.tombstones.lock().peek(&id).cloned()
    }

    /// Retained eviction records, newest first
    pub fn recent_evictions(&self, limit: usize) -> Vec<Tombstone> {
        self.tombstones
            .lock()
            .iter()
            .take(limit)
            .map(|(_, tombstone)| tombstone.clone())
            .collect()
    }

    pub fn consolidation_config(&self) -> &crate::config::ConsolidationConfig {
        self.engine.config()
    }

    fn bury(&self, item: &MemoryItem, reason: EvictionReason, now: DateTime<Utc>) {
        self.counters.record_eviction(reason);
        self.tombstones
            .lock()
            .put(item.id, Tombstone::new(item, reason, now));
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("short_term", &self.len(Tier::ShortTerm))
            .field("working", &self.len(Tier::Working))
            .field("long_term", &self.len(Tier::LongTerm))
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

fn check_factor(factor: f32) -> Result<()> {
    if factor.is_finite() && factor >= 0.0 {
        Ok(())
    } else {
        Err(EngramError::InvalidImportance(factor))
    }
}
