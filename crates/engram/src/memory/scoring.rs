//! Scoring functions for retrieval ranking and consolidation
//!
//! Relevance drives `retrieve`; the promotion score decides which
//! short-term items graduate to long-term memory.

use std::collections::BTreeSet;

use crate::memory::types::MemoryItem;

/// Weights and normalisation for the promotion score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromotionWeights {
    /// Weight of importance (default: 0.6)
    pub importance_weight: f32,
    /// Weight of normalised access count (default: 0.4)
    pub access_weight: f32,
    /// Access count at which the access term saturates at 1.0 (default: 5)
    pub access_saturation: u32,
}

impl Default for PromotionWeights {
    fn default() -> Self {
        Self {
            importance_weight: 0.6,
            access_weight: 0.4,
            access_saturation: 5,
        }
    }
}

/// Access count mapped onto [0.0, 1.0]: `min(count, saturation) / saturation`
pub fn normalized_access(access_count: u32, saturation: u32) -> f32 {
    if saturation == 0 {
        return if access_count > 0 { 1.0 } else { 0.0 };
    }
    access_count.min(saturation) as f32 / saturation as f32
}

/// `importance * importance_weight + normalized(access_count) * access_weight`
pub fn promotion_score(item: &MemoryItem, weights: &PromotionWeights) -> f32 {
    item.importance * weights.importance_weight
        + normalized_access(item.access_count, weights.access_saturation) * weights.access_weight
}

/// Jaccard overlap of two token sets: |a ∩ b| / |a ∪ b|
pub fn token_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    if shared == 0 {
        return 0.0;
    }
    let union = a.len() + b.len() - shared;
    shared as f32 / union as f32
}

/// Relevance of an item to a query, or `None` when no token is shared.
///
/// The score is the token overlap weighted by the item's importance.
pub fn relevance(query: &BTreeSet<String>, item: &MemoryItem) -> Option<f32> {
    let overlap = token_overlap(query, item.content.tokens());
    (overlap > 0.0).then(|| overlap * item.importance)
}
