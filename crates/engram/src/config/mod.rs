//! Configuration for Engram
//!
//! Loaded from TOML; every field has a default so partial files are valid.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{EngramError, Result};
use crate::memory::scoring::PromotionWeights;
use crate::memory::types::Tier;
use crate::storage::scheduler::MAX_INTERVAL;

/// Main configuration structure for Engram
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tier capacities
    #[serde(default)]
    pub tiers: TierConfig,
    /// Promotion, decay and expiry settings
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    /// Periodic consolidation
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Eviction record retention
    #[serde(default)]
    pub tombstones: TombstoneConfig,
}

impl Config {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngramError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| EngramError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else the first default location that
    /// exists, else built-in defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.tiers.validate()?;
        self.consolidation.validate()?;
        if self.scheduler.enabled && self.scheduler.interval_secs == 0 {
            return Err(EngramError::Config(
                "scheduler.interval_secs must be positive when the scheduler is enabled".into(),
            ));
        }
        if self.scheduler.interval_secs > MAX_INTERVAL.as_secs() {
            return Err(EngramError::Config(format!(
                "scheduler.interval_secs must be at most {}, got {}",
                MAX_INTERVAL.as_secs(),
                self.scheduler.interval_secs
            )));
        }
        if self.tombstones.capacity == 0 {
            return Err(EngramError::Config(
                "tombstones.capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// `~/.engram/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".engram").join("config.toml"))
}

/// Capacities of the three tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_short_term_capacity")]
    pub short_term_capacity: usize,
    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,
    #[serde(default = "default_long_term_capacity")]
    pub long_term_capacity: usize,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: default_short_term_capacity(),
            working_capacity: default_working_capacity(),
            long_term_capacity: default_long_term_capacity(),
        }
    }
}

impl TierConfig {
    pub fn new(short_term_capacity: usize, working_capacity: usize, long_term_capacity: usize) -> Self {
        Self {
            short_term_capacity,
            working_capacity,
            long_term_capacity,
        }
    }

    pub fn capacity(&self, tier: Tier) -> Result<NonZeroUsize> {
        let raw = match tier {
            Tier::ShortTerm => self.short_term_capacity,
            Tier::Working => self.working_capacity,
            Tier::LongTerm => self.long_term_capacity,
        };
        NonZeroUsize::new(raw)
            .ok_or_else(|| EngramError::Config(format!("tiers.{tier}_capacity must be positive")))
    }

    fn validate(&self) -> Result<()> {
        for tier in Tier::ALL {
            self.capacity(tier)?;
        }
        Ok(())
    }
}

fn default_short_term_capacity() -> usize {
    7
}

fn default_working_capacity() -> usize {
    32
}

fn default_long_term_capacity() -> usize {
    1000
}

/// Consolidation thresholds and rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Minimum promotion score for short-term -> long-term
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: f32,
    /// Minimum access count for promotion
    #[serde(default = "default_min_promotion_accesses")]
    pub min_promotion_accesses: u32,
    /// Weight of importance in the promotion score
    #[serde(default = "default_importance_weight")]
    pub importance_weight: f32,
    /// Weight of normalised access count in the promotion score
    #[serde(default = "default_access_weight")]
    pub access_weight: f32,
    /// Access count at which the access term saturates
    #[serde(default = "default_access_saturation")]
    pub access_saturation: u32,
    /// Multiplicative importance decay per pass
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f32,
    /// Importance below which never-accessed items are forgotten
    #[serde(default = "default_forget_floor")]
    pub forget_floor: f32,
    /// Working-memory time-to-live in seconds, measured from creation
    #[serde(default = "default_working_ttl_secs")]
    pub working_ttl_secs: u64,
    /// Run a pass before storing into a full short-term tier
    #[serde(default)]
    pub consolidate_on_pressure: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: default_promotion_threshold(),
            min_promotion_accesses: default_min_promotion_accesses(),
            importance_weight: default_importance_weight(),
            access_weight: default_access_weight(),
            access_saturation: default_access_saturation(),
            decay_factor: default_decay_factor(),
            forget_floor: default_forget_floor(),
            working_ttl_secs: default_working_ttl_secs(),
            consolidate_on_pressure: false,
        }
    }
}

impl ConsolidationConfig {
    pub fn weights(&self) -> PromotionWeights {
        PromotionWeights {
            importance_weight: self.importance_weight,
            access_weight: self.access_weight,
            access_saturation: self.access_saturation,
        }
    }

    /// TTLs too large for a `Duration` saturate, so working memory never expires.
    pub fn working_ttl(&self) -> Duration {
        i64::try_from(self.working_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Set the working-memory TTL
    pub fn with_working_ttl_secs(mut self, secs: u64) -> Self {
        self.working_ttl_secs = secs;
        self
    }

    /// Set the decay factor and forgetting floor
    pub fn with_decay(mut self, decay_factor: f32, forget_floor: f32) -> Self {
        self.decay_factor = decay_factor;
        self.forget_floor = forget_floor;
        self
    }

    fn validate(&self) -> Result<()> {
        let unit = [
            ("promotion_threshold", self.promotion_threshold),
            ("importance_weight", self.importance_weight),
            ("access_weight", self.access_weight),
            ("forget_floor", self.forget_floor),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngramError::Config(format!(
                    "consolidation.{name} must be in [0.0, 1.0], got {value}"
                )));
            }
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(EngramError::Config(format!(
                "consolidation.decay_factor must be in (0.0, 1.0], got {}",
                self.decay_factor
            )));
        }
        if self.access_saturation == 0 {
            return Err(EngramError::Config(
                "consolidation.access_saturation must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_promotion_threshold() -> f32 {
    0.75
}

fn default_min_promotion_accesses() -> u32 {
    2
}

fn default_importance_weight() -> f32 {
    0.6
}

fn default_access_weight() -> f32 {
    0.4
}

fn default_access_saturation() -> u32 {
    5
}

fn default_decay_factor() -> f32 {
    0.95
}

fn default_forget_floor() -> f32 {
    0.05
}

fn default_working_ttl_secs() -> u64 {
    300
}

/// Periodic consolidation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Spawn the periodic consolidation task
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.clamp(1, MAX_INTERVAL.as_secs()))
    }
}

fn default_interval_secs() -> u64 {
    60
}

/// Eviction record retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TombstoneConfig {
    /// Number of most recent tombstones kept
    #[serde(default = "default_tombstone_capacity")]
    pub capacity: usize,
}

impl Default for TombstoneConfig {
    fn default() -> Self {
        Self {
            capacity: default_tombstone_capacity(),
        }
    }
}

fn default_tombstone_capacity() -> usize {
    256
}
