use crate::phrase::Word;
use fnv::FnvHashMap;
use std::sync::{PoisonError, RwLock};

/// A cache from words to the ids of a shared read-only model, shared by all
/// workers.
///
/// Lookups of cached words only take the read lock and proceed in parallel.
/// A miss takes the write lock for the insertion, after checking again
/// whether another worker inserted the word in the meantime.
#[derive(Debug, Default)]
pub struct VocabCache {
    ids: RwLock<FnvHashMap<Word, usize>>,
}

impl VocabCache {
    pub fn new() -> Self {
        VocabCache::default()
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        let ids = self.ids.read().unwrap_or_else(PoisonError::into_inner);
        ids.get(word).cloned()
    }

    /// Returns the cached id of `word`, or caches and returns `lookup(word)`.
    pub fn get_or_insert_with<F>(&self, word: &Word, lookup: F) -> usize
    where
        F: FnOnce(&str) -> usize,
    {
        if let Some(id) = self.get(word) {
            return id;
        }
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        *ids.entry(word.clone()).or_insert_with(|| lookup(word))
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
