//! Cognitive module adapter
//!
//! Lets the store take part in a larger pipeline of modules that each turn
//! an input into a [`Thought`] and adjust themselves from [`Feedback`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::memory::types::{Content, MemoryId, Tier};
use crate::storage::retrieval::RetrievedMemory;
use crate::storage::store::MemoryStore;

/// Output of one processing step
#[derive(Debug, Clone, Serialize)]
pub struct Thought<T> {
    pub content: T,
    /// Module's confidence in the output, in [0.0, 1.0]
    pub confidence: f32,
    /// Name of the module that produced it
    pub source_module: String,
    pub metadata: BTreeMap<String, String>,
}

/// Signals fed back to modules after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    /// The recent output was useful; strengthen what produced it
    Reinforce,
    /// The recent output was not useful. Memory modules accept and ignore it.
    Penalize,
}

/// A processing unit in a cognitive pipeline.
pub trait CognitiveModule {
    type Input;
    type Output;

    fn name(&self) -> &str;

    fn process(&self, input: Self::Input) -> Result<Thought<Self::Output>>;

    fn update(&self, feedback: &Feedback) -> Result<()>;
}

/// What [`MemoryModule`] remembered and recalled for an input
#[derive(Debug, Clone, Serialize)]
pub struct Recall {
    pub stored: MemoryId,
    pub similar: Vec<RetrievedMemory>,
}

const INPUT_IMPORTANCE: f32 = 0.5;
const SIMILAR_LIMIT: usize = 5;
const REINFORCE_COUNT: usize = 3;
const REINFORCE_FACTOR: f32 = 1.2;

/// Exposes a shared [`MemoryStore`] as a [`CognitiveModule`].
#[derive(Debug, Clone)]
pub struct MemoryModule {
    name: String,
    store: Arc<MemoryStore>,
}

impl MemoryModule {
    pub fn new(name: impl Into<String>, store: Arc<MemoryStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl CognitiveModule for MemoryModule {
    type Input = Content;
    type Output = Recall;

    fn name(&self) -> &str {
        &self.name
    }

    /// Store the input in short-term memory and recall up to five other
    /// memories that share tokens with it.
    fn process(&self, input: Content) -> Result<Thought<Recall>> {
        let query = input.text().to_owned();
        let stored = self.store.store(input, INPUT_IMPORTANCE, Tier::ShortTerm)?;

        let similar = self
            .store
            .retrieve(&query, SIMILAR_LIMIT + 1)
            .into_iter()
            .filter(|hit| hit.memory.id != stored)
            .take(SIMILAR_LIMIT)
            .collect();

        let mut metadata = BTreeMap::new();
        metadata.insert("memory_type".to_owned(), Tier::ShortTerm.as_str().to_owned());

        Ok(Thought {
            content: Recall { stored, similar },
            confidence: 0.9,
            source_module: self.name.clone(),
            metadata,
        })
    }

    fn update(&self, feedback: &Feedback) -> Result<()> {
        match feedback {
            Feedback::Reinforce => {
                self.store
                    .reinforce_recent(Tier::ShortTerm, REINFORCE_COUNT, REINFORCE_FACTOR)?;
            }
            Feedback::Penalize => {
                tracing::debug!(module = %self.name, "Ignoring penalize feedback");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn module() -> MemoryModule {
        let store = Arc::new(MemoryStore::new(&Config::default()).unwrap());
        MemoryModule::new("memory", store)
    }

    #[test]
    fn test_process_stores_and_recalls_others() {
        let module = module();
        let first = module.process(Content::new("the sky is blue")).unwrap();
        assert!(first.content.similar.is_empty());
        assert_eq!(first.source_module, "memory");
        assert_eq!(first.metadata["memory_type"], "short_term");

        let second = module.process(Content::new("blue whales")).unwrap();
        let ids: Vec<MemoryId> = second.content.similar.iter().map(|r| r.memory.id).collect();
        assert_eq!(ids, vec![first.content.stored]);
        assert_eq!(module.store().len(Tier::ShortTerm), 2);
    }

    #[test]
    fn test_process_rejects_empty_input() {
        let module = module();
        assert!(module.process(Content::new("...")).is_err());
    }

    #[test]
    fn test_reinforce_feedback_boosts_recent() {
        let module = module();
        let thought = module.process(Content::new("remember this")).unwrap();
        module.update(&Feedback::Reinforce).unwrap();

        let item = module.store().peek(thought.content.stored).unwrap();
        assert!((item.importance - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_penalize_is_a_no_op() {
        let module = module();
        let thought = module.process(Content::new("remember this")).unwrap();
        module.update(&Feedback::Penalize).unwrap();
        assert_eq!(module.store().peek(thought.content.stored).unwrap().importance, 0.5);
    }
}
