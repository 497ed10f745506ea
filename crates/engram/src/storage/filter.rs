//! Filter types for retrieval
//!
//! Allows queries to be narrowed by tier, tags and importance.

use crate::memory::types::{MemoryItem, Tier};

/// Filter criteria for retrieval.
///
/// All fields are optional - when unset, that filter is not applied.
/// Multiple filters are combined with AND logic.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Only search these tiers (OR logic within this filter)
    pub tiers: Option<Vec<Tier>>,
    /// Every listed tag must be present on the item
    pub tags: Vec<String>,
    /// Minimum importance threshold (inclusive)
    pub min_importance: Option<f32>,
}

impl MemoryFilter {
    /// Create a new empty filter (no filtering applied)
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the search to the given tiers
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = Some(tiers);
        self
    }

    /// Require a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Filter by minimum importance
    pub fn with_min_importance(mut self, min_importance: f32) -> Self {
        self.min_importance = Some(min_importance);
        self
    }

    /// Whether the tier should be searched at all
    pub fn includes_tier(&self, tier: Tier) -> bool {
        self.tiers
            .as_ref()
            .is_none_or(|tiers| tiers.is_empty() || tiers.contains(&tier))
    }

    pub fn matches(&self, item: &MemoryItem) -> bool {
        if !self.includes_tier(item.tier) {
            return false;
        }
        if let Some(min) = self.min_importance {
            if item.importance < min {
                return false;
            }
        }
        self.tags.iter().all(|tag| item.tags.contains(tag))
    }
}
