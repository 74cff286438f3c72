/// Outside collaborators of the importer: story persistence and import
/// notifications.

use std::sync::Mutex;
use thiserror::Error;

use crate::core::pipeline::ImportError;
use crate::schema::story::Story;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("story rejected by store: {0}")]
    Rejected(String),
}

/// Durable id assigned by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct DurableId(pub u64);

/// A story as the store keeps it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredStory {
    pub id: DurableId,
    pub story: Story,
}

/// Consumer of finished stories.
pub trait StoryStore {
    fn create_story(&self, story: Story) -> Result<StoredStory, StoreError>;
}

/// Receives import outcomes. Has no say in the pipeline's result.
pub trait ImportObserver: Send + Sync {
    fn imported(&self, _story: &Story) {}
    fn failed(&self, _error: &ImportError) {}
}

/// Store that keeps everything in memory and numbers stories from 1.
#[derive(Debug, Default)]
pub struct InMemoryStoryStore {
    stories: Mutex<Vec<StoredStory>>,
}

impl InMemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stories.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: DurableId) -> Option<StoredStory> {
        self.stories
            .lock()
            .ok()?
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }
}

impl StoryStore for InMemoryStoryStore {
    fn create_story(&self, story: Story) -> Result<StoredStory, StoreError> {
        let mut stories = self
            .stories
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        let stored = StoredStory {
            id: DurableId(stories.len() as u64 + 1),
            story,
        };
        stories.push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::{AssemblyHints, StoryAssembler};
    use crate::core::tables::HeuristicTables;
    use crate::schema::story::StorySource;

    fn story() -> Story {
        StoryAssembler::new(HeuristicTables::builtin())
            .assemble(&[], &AssemblyHints::default())
            .into_story(Vec::new(), 50, StorySource::Manual)
    }

    #[test]
    fn in_memory_store_assigns_sequential_ids() {
        let store = InMemoryStoryStore::new();
        assert!(store.is_empty());
        let first = store.create_story(story()).unwrap();
        let second = store.create_story(story()).unwrap();
        assert_eq!(first.id, DurableId(1));
        assert_eq!(second.id, DurableId(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(DurableId(2)).map(|s| s.id), Some(DurableId(2)));
        assert!(store.get(DurableId(9)).is_none());
    }
}
