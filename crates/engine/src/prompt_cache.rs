use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

/// Prompt ideas keyed by the exact sentence text they were generated for.
///
/// Bounded: once `capacity` sentences are cached the least recently used one
/// is evicted. Keys are compared byte for byte with no normalization.
#[derive(Debug)]
pub struct PromptCache {
    inner: Mutex<LruCache<String, Vec<String>>>,
}

impl PromptCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, sentence: &str) -> Option<Vec<String>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sentence)
            .cloned()
    }

    pub fn insert(&self, sentence: &str, ideas: Vec<String>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(sentence.to_string(), ideas);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_text_is_the_key() {
        let cache = PromptCache::new(4);
        cache.insert("Hello.", vec!["Be formal".into()]);
        assert_eq!(cache.get("Hello."), Some(vec!["Be formal".to_string()]));
        assert_eq!(cache.get("hello."), None);
        assert_eq!(cache.get("Hello. "), None);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = PromptCache::new(2);
        cache.insert("a", vec![]);
        cache.insert("b", vec![]);
        assert!(cache.get("a").is_some());
        cache.insert("c", vec![]);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.len(), 2);
    }
}
