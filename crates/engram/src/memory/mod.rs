//! Memory types and scoring
//!
//! Defines the core memory record, eviction tombstones, and the scoring
//! functions shared by retrieval and consolidation.

pub mod scoring;
pub mod tombstone;
pub mod types;

pub use scoring::{PromotionWeights, promotion_score, relevance, token_overlap};
pub use tombstone::{EvictionReason, Tombstone};
pub use types::{Content, EvictionKey, MemoryId, MemoryItem, Tier};
