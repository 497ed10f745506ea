//! Tier storage, retrieval and consolidation
//!
//! - `tier`: the bounded per-tier container
//! - `consolidation`: promotion, decay and expiry passes
//! - `store`: the `MemoryStore` composing the tiers

pub mod consolidation;
pub mod filter;
pub mod retrieval;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod tier;

pub use consolidation::{ConsolidationEngine, ConsolidationReport, Eviction, TierSet};
pub use filter::MemoryFilter;
pub use retrieval::RetrievedMemory;
pub use scheduler::{ConsolidationScheduler, SchedulerHandle};
pub use stats::{EvictionCounts, StoreStats, TierStats};
pub use store::{MemoryStore, StoreRequest};
pub use tier::{Admitted, BoundedTier, Scan};
