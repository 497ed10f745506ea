//! Memory types for the Engram store
//!
//! Defines the `MemoryItem` record, its identifier, the tier enum and the
//! tokenized content representation used for matching.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-unique identifier, allocated from a monotonically increasing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub u64);

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three bounded containers an item can live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Fresh, un-consolidated memories
    ShortTerm,
    /// Scratch space for the current task; expires by TTL
    Working,
    /// Consolidated memories
    LongTerm,
}

impl Tier {
    /// All tiers, in routing order
    pub const ALL: [Tier; 3] = [Tier::ShortTerm, Tier::Working, Tier::LongTerm];

    /// Global lock acquisition order (alphabetical by name)
    pub const LOCK_ORDER: [Tier; 3] = [Tier::LongTerm, Tier::ShortTerm, Tier::Working];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::ShortTerm => "short_term",
            Tier::Working => "working",
            Tier::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "short_term" | "short" | "stm" => Ok(Tier::ShortTerm),
            "working" | "wm" => Ok(Tier::Working),
            "long_term" | "long" | "ltm" => Ok(Tier::LongTerm),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Caller-supplied payload, kept as text plus the bag of tokens used for matching.
///
/// Tokens are the lowercase alphanumeric runs of the text. Content with no
/// tokens is considered empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    text: String,
    tokens: BTreeSet<String>,
}

impl Content {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    /// Build content from pre-tokenized atoms; the text is the atoms joined by spaces.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: BTreeSet<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.is_empty())
            .collect();
        let text = tokens.iter().cloned().collect::<Vec<_>>().join(" ");
        Self { text, tokens }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &BTreeSet<String> {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::new(text)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::new(text)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A single unit of remembered information.
///
/// Content is fixed at creation; the metadata (importance, access stats,
/// tier) is mutated in place by retrieval and consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique identifier for this item
    pub id: MemoryId,
    /// The remembered payload
    pub content: Content,
    /// Importance in [0.0, 1.0]
    pub importance: f32,
    /// Caller-supplied labels
    pub tags: BTreeSet<String>,
    /// When this item was stored
    pub created_at: DateTime<Utc>,
    /// When this item was last returned by a retrieval
    pub last_accessed_at: DateTime<Utc>,
    /// How many retrievals returned this item
    pub access_count: u32,
    /// Which tier currently holds this item
    pub tier: Tier,
}

impl MemoryItem {
    pub fn new(
        id: MemoryId,
        content: Content,
        importance: f32,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content,
            importance: clamp_importance(importance),
            tags: BTreeSet::new(),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            tier,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Record a successful retrieval
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
    }

    /// Update the importance, clamped to [0.0, 1.0]
    pub fn set_importance(&mut self, importance: f32) {
        self.importance = clamp_importance(importance);
    }
}

/// NaN maps to 0.0
fn clamp_importance(importance: f32) -> f32 {
    if importance.is_nan() {
        0.0
    } else {
        importance.clamp(0.0, 1.0)
    }
}

impl PartialEq for MemoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemoryItem {}

/// Eviction ordering key: least important, then least recently used, then
/// earliest arrival in the tier. The smallest key is evicted first.
#[derive(Debug, Clone, Copy)]
pub struct EvictionKey {
    pub importance: f32,
    pub last_accessed_at: DateTime<Utc>,
    pub arrival: u64,
}

impl EvictionKey {
    pub fn of(item: &MemoryItem, arrival: u64) -> Self {
        Self {
            importance: item.importance,
            last_accessed_at: item.last_accessed_at,
            arrival,
        }
    }
}

impl PartialEq for EvictionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EvictionKey {}

impl PartialOrd for EvictionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvictionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.importance
            .total_cmp(&other.importance)
            .then_with(|| self.last_accessed_at.cmp(&other.last_accessed_at))
            .then_with(|| self.arrival.cmp(&other.arrival))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(id: u64, importance: f32) -> MemoryItem {
        MemoryItem::new(
            MemoryId(id),
            Content::new("test content"),
            importance,
            Tier::ShortTerm,
            Utc::now(),
        )
    }

    mod content {
        use super::*;

        #[test]
        fn test_tokenize_lowercases_and_splits() {
            let content = Content::new("Alpha, beta;  ALPHA gamma-delta");
            let tokens: Vec<&str> = content.tokens().iter().map(String::as_str).collect();
            assert_eq!(tokens, vec!["alpha", "beta", "delta", "gamma"]);
            assert_eq!(content.text(), "Alpha, beta;  ALPHA gamma-delta");
        }

        #[test]
        fn test_whitespace_only_is_empty() {
            assert!(Content::new("").is_empty());
            assert!(Content::new("   \t\n").is_empty());
            assert!(Content::new("...!?").is_empty());
            assert!(!Content::new("x").is_empty());
        }

        #[test]
        fn test_from_tokens_drops_empty_atoms() {
            let content = Content::from_tokens(["b", "", "a"]);
            assert_eq!(content.text(), "a b");
            assert_eq!(content.tokens().len(), 2);
        }
    }

    mod memory_item {
        use super::*;

        #[test]
        fn test_new_defaults() {
            let memory = item(1, 0.4);
            assert_eq!(memory.access_count, 0);
            assert_eq!(memory.created_at, memory.last_accessed_at);
            assert!(memory.tags.is_empty());
            assert_eq!(memory.tier, Tier::ShortTerm);
        }

        #[test]
        fn test_mark_accessed() {
            let mut memory = item(1, 0.4);
            let later = memory.created_at + Duration::seconds(5);
            memory.mark_accessed(later);
            assert_eq!(memory.access_count, 1);
            assert_eq!(memory.last_accessed_at, later);
        }

        #[test]
        fn test_mark_accessed_never_moves_timestamp_back() {
            let mut memory = item(1, 0.4);
            let before = memory.last_accessed_at;
            memory.mark_accessed(before - Duration::seconds(5));
            assert_eq!(memory.last_accessed_at, before);
            assert_eq!(memory.access_count, 1);
        }

        #[test]
        fn test_set_importance_clamps() {
            let mut memory = item(1, 0.4);
            memory.set_importance(1.7);
            assert_eq!(memory.importance, 1.0);
            memory.set_importance(-0.2);
            assert_eq!(memory.importance, 0.0);
            memory.set_importance(f32::NAN);
            assert_eq!(memory.importance, 0.0);
        }

        #[test]
        fn test_new_clamps_importance() {
            assert_eq!(item(1, f32::NAN).importance, 0.0);
            assert_eq!(item(2, 3.0).importance, 1.0);
            assert_eq!(item(3, -1.0).importance, 0.0);
        }

        #[test]
        fn test_equality_is_by_id() {
            let a = item(7, 0.1);
            let b = item(7, 0.9);
            assert_eq!(a, b);
            assert_ne!(a, item(8, 0.1));
        }
    }

    mod eviction_key {
        use super::*;

        #[test]
        fn test_lower_importance_sorts_first() {
            let low = item(1, 0.1);
            let high = item(2, 0.9);
            assert!(EvictionKey::of(&low, 5) < EvictionKey::of(&high, 0));
        }

        #[test]
        fn test_recency_breaks_importance_ties() {
            let stale = item(1, 0.5);
            let mut fresh = item(2, 0.5);
            fresh.last_accessed_at = stale.last_accessed_at + Duration::seconds(1);
            assert!(EvictionKey::of(&stale, 9) < EvictionKey::of(&fresh, 0));
        }

        #[test]
        fn test_arrival_breaks_remaining_ties() {
            let a = item(1, 0.5);
            let mut b = item(2, 0.5);
            b.last_accessed_at = a.last_accessed_at;
            assert!(EvictionKey::of(&a, 0) < EvictionKey::of(&b, 1));
        }
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!("short_term".parse::<Tier>().unwrap(), Tier::ShortTerm);
        assert_eq!("LTM".parse::<Tier>().unwrap(), Tier::LongTerm);
        assert_eq!("working".parse::<Tier>().unwrap(), Tier::Working);
        assert!("episodic".parse::<Tier>().is_err());
        assert_eq!(Tier::LongTerm.to_string(), "long_term");
    }

    #[test]
    fn test_lock_order_is_alphabetical() {
        let names: Vec<&str> = Tier::LOCK_ORDER.iter().map(Tier::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_memory_item_serialization() {
        let memory = item(3, 0.6).with_tags(["fact"]);
        let json = serde_json::to_string(&memory).expect("Failed to serialize memory");
        let deserialized: MemoryItem =
            serde_json::from_str(&json).expect("Failed to deserialize memory");
        assert_eq!(memory.id, deserialized.id);
        assert_eq!(memory.content, deserialized.content);
        assert_eq!(memory.tags, deserialized.tags);
        assert_eq!(memory.tier, deserialized.tier);
    }
}
