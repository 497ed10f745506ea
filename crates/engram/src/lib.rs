//! Engram - bounded, tiered memory store
//!
//! This crate holds units of remembered information in three fixed-capacity
//! tiers (short-term, working, long-term), ranks them by importance and
//! token overlap, and runs consolidation passes that promote, decay and
//! expire items under strict capacity limits.

pub mod clock;
pub mod config;
pub mod error;
pub mod memory;
pub mod module;
pub mod storage;
pub mod testing;

pub use error::{EngramError, RejectReason, Rejected, Result};
pub use memory::types::{Content, MemoryId, MemoryItem, Tier};
pub use storage::{MemoryFilter, MemoryStore, StoreRequest, StoreStats, TierStats};
