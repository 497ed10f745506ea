//! Fixed-capacity container for one memory tier
//!
//! A `BoundedTier` never holds more than `capacity` items. Inserting into a
//! full tier first evicts the item with the smallest [`EvictionKey`], so the
//! ceiling holds even inside the insert call.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};

use crate::error::Rejected;
use crate::memory::types::{EvictionKey, MemoryId, MemoryItem, Tier};
use crate::storage::retrieval::{RetrievedMemory, rank_order};

#[derive(Debug, Clone)]
struct Slot {
    item: MemoryItem,
    arrival: u64,
}

/// Outcome of a successful insertion
#[derive(Debug, Clone)]
pub struct Admitted {
    /// Identifier of the admitted item
    pub id: MemoryId,
    /// Item displaced to make room, if the tier was full
    pub evicted: Option<MemoryItem>,
}

/// A bounded container implementing insertion, lookup and eviction for one tier.
#[derive(Debug, Clone)]
pub struct BoundedTier {
    tier: Tier,
    capacity: NonZeroUsize,
    items: HashMap<MemoryId, Slot>,
    /// arrival sequence -> id, used as the eviction tie-break
    insertion_order: BTreeMap<u64, MemoryId>,
    next_arrival: u64,
}

impl BoundedTier {
    pub fn new(tier: Tier, capacity: NonZeroUsize) -> Self {
        Self {
            tier,
            capacity,
            items: HashMap::with_capacity(capacity.get().min(4096)),
            insertion_order: BTreeMap::new(),
            next_arrival: 0,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity.get()
    }

    pub fn contains(&self, id: MemoryId) -> bool {
        self.items.contains_key(&id)
    }

    /// Admit an item, evicting exactly one resident first if the tier is full.
    ///
    /// The incoming item is never the eviction victim. Its `tier` field is
    /// rewritten to this tier. Re-inserting a resident id replaces it in place
    /// without evicting anything.
    pub fn insert(&mut self, mut item: MemoryItem) -> Result<Admitted, Rejected> {
        if item.content.is_empty() {
            return Err(Rejected::empty_content());
        }

        let replaced = self.take(item.id).is_some();
        let evicted = if !replaced && self.is_full() {
            self.evict_one()
        } else {
            None
        };

        item.tier = self.tier;
        let id = item.id;
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.insertion_order.insert(arrival, id);
        self.items.insert(id, Slot { item, arrival });

        if let Some(ref victim) = evicted {
            tracing::debug!(
                tier = %self.tier,
                admitted = %id,
                evicted = %victim.id,
                importance = victim.importance,
                "Evicted item to admit new memory"
            );
        }

        self.check_invariants();
        Ok(Admitted { id, evicted })
    }

    /// Look up an item, recording the access.
    pub fn get(&mut self, id: MemoryId, now: DateTime<Utc>) -> Option<&MemoryItem> {
        let slot = self.items.get_mut(&id)?;
        slot.item.mark_accessed(now);
        Some(&slot.item)
    }

    /// Look up an item without touching its access statistics.
    pub fn peek(&self, id: MemoryId) -> Option<&MemoryItem> {
        self.items.get(&id).map(|slot| &slot.item)
    }

    /// Rewrite an item's importance; returns the new (clamped) value.
    pub fn adjust_importance<F>(&mut self, id: MemoryId, adjust: F) -> Option<f32>
    where
        F: FnOnce(f32) -> f32,
    {
        let slot = self.items.get_mut(&id)?;
        let next = adjust(slot.item.importance);
        slot.item.set_importance(next);
        Some(slot.item.importance)
    }

    /// Score every resident with `score` and return the matches, most relevant first.
    ///
    /// Items for which `score` returns `None` are skipped. The sequence is a
    /// snapshot computed per call; no cursor state is kept in the tier.
    pub fn scan<F>(&self, score: F) -> Scan
    where
        F: Fn(&MemoryItem) -> Option<f32>,
    {
        let mut matches: Vec<RetrievedMemory> = self
            .items
            .values()
            .filter_map(|slot| {
                score(&slot.item).map(|relevance| RetrievedMemory {
                    memory: slot.item.clone(),
                    relevance,
                })
            })
            .collect();
        matches.sort_by(rank_order);
        Scan {
            inner: matches.into_iter(),
        }
    }

    /// Remove an item; true if it was resident.
    pub fn remove(&mut self, id: MemoryId) -> bool {
        self.take(id).is_some()
    }

    /// Remove an item and hand it back.
    pub fn take(&mut self, id: MemoryId) -> Option<MemoryItem> {
        let slot = self.items.remove(&id)?;
        self.insertion_order.remove(&slot.arrival);
        self.check_invariants();
        Some(slot.item)
    }

    /// The id that the next forced eviction would remove.
    pub fn eviction_candidate(&self) -> Option<MemoryId> {
        self.items
            .values()
            .min_by_key(|slot| EvictionKey::of(&slot.item, slot.arrival))
            .map(|slot| slot.item.id)
    }

    /// Residents in arrival order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &MemoryItem> + '_ {
        self.insertion_order
            .values()
            .filter_map(|id| self.items.get(id).map(|slot| &slot.item))
    }

    /// Mutable access to every resident, in no particular order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MemoryItem> + '_ {
        self.items.values_mut().map(|slot| &mut slot.item)
    }

    /// Ids of the `count` most recent arrivals, newest first.
    pub fn most_recent(&self, count: usize) -> Vec<MemoryId> {
        self.insertion_order.values().rev().take(count).copied().collect()
    }

    fn evict_one(&mut self) -> Option<MemoryItem> {
        let victim = self.eviction_candidate()?;
        self.take(victim)
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.items.len() <= self.capacity.get(),
            "{} tier holds {} items, capacity {}",
            self.tier,
            self.items.len(),
            self.capacity
        );
        debug_assert_eq!(self.items.len(), self.insertion_order.len());
    }
}

/// Relevance-ordered matches produced by [`BoundedTier::scan`]
#[derive(Debug)]
pub struct Scan {
    inner: std::vec::IntoIter<RetrievedMemory>,
}

impl Iterator for Scan {
    type Item = RetrievedMemory;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Scan {}
