//! Retrieval ranking
//!
//! Matches from every tier are merged and ordered by relevance, with ties
//! broken by access count, then recency, then id.

use std::cmp::Ordering;

use serde::Serialize;

use crate::memory::types::MemoryItem;

/// A retrieved memory with its relevance score
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMemory {
    /// Snapshot of the memory
    pub memory: MemoryItem,
    /// Token overlap weighted by importance
    pub relevance: f32,
}

/// Total order used for every ranked sequence: relevance descending, then
/// higher `access_count`, then more recent `last_accessed_at`, then lower id.
pub fn rank_order(a: &RetrievedMemory, b: &RetrievedMemory) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| b.memory.access_count.cmp(&a.memory.access_count))
        .then_with(|| b.memory.last_accessed_at.cmp(&a.memory.last_accessed_at))
        .then_with(|| a.memory.id.cmp(&b.memory.id))
}

/// Merge per-tier result sequences into one ranked, truncated list.
pub fn merge_ranked<I>(sources: I, limit: usize) -> Vec<RetrievedMemory>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = RetrievedMemory>,
{
    let mut merged: Vec<RetrievedMemory> = sources.into_iter().flatten().collect();
    merged.sort_by(rank_order);
    merged.truncate(limit);
    merged
}
