// Single-flight resource cache.
//
// Replaces implicit framework-managed singletons with an explicit object:
// created by its owner, initialized lazily per key on first access, dropped
// with its owner (normally at process exit). Entries are never evicted or
// reinitialized.
//
// Each key gets its own `OnceCell`. The map lock is only held long enough to
// find or create the cell, so building one key never blocks callers of
// another. Concurrent callers of the same key block on the cell while the
// first caller runs the factory; they then all see the same `Arc`. If the
// factory fails, the cell stays empty and the next caller tries again.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::summarize::traits::SummaryModel;
use crate::topics::corpus::Corpus;

/// Key under which the summarization model is cached. There is only ever one.
pub const SUMMARIZER_KEY: &str = "summarizer";

/// Memoizes `factory` results per key for the lifetime of the cache.
pub struct ModelCache<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K, V> Default for ModelCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ModelCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `factory` if there isn't one.
    ///
    /// `factory` runs at most once per key across all threads, unless it
    /// fails, in which case nothing is stored and a later call retries.
    pub fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = {
            // Slots only hold Arcs; a panic elsewhere can't leave them half-written
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let result = slot.get_or_try_init(|| factory().map(Arc::new)).cloned();
        if result.is_err() {
            self.discard_empty(&key, &slot);
        }
        result
    }

    /// Drop `slot` from the map if it is still the slot for `key` and still
    /// empty, so failed keys don't accumulate.
    fn discard_empty(&self, key: &K, slot: &Arc<OnceCell<Arc<V>>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if stale {
            slots.remove(key);
        }
    }

    /// Cached value for `key`, without creating one.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of initialized entries.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Content-derived cache key: hex SHA-256 of the document text.
pub fn content_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// The two cache scopes the pipeline uses: one global summarization model,
/// and one corpus per distinct document.
#[derive(Default)]
pub struct ResourceCache {
    summarizer: ModelCache<&'static str, Arc<dyn SummaryModel>>,
    corpora: ModelCache<String, Corpus>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The summarization model, loaded by `loader` on first use.
    pub fn summarizer<E, F>(&self, loader: F) -> Result<Arc<dyn SummaryModel>, E>
    where
        F: FnOnce() -> Result<Arc<dyn SummaryModel>, E>,
    {
        self.summarizer
            .get_or_create(SUMMARIZER_KEY, || {
                debug!("Loading summarization model");
                loader()
            })
            .map(|model| Arc::clone(&*model))
    }

    /// Corpus for `text`, built by `builder` unless this exact text was seen before.
    pub fn corpus<E, F>(&self, text: &str, builder: F) -> Result<Arc<Corpus>, E>
    where
        F: FnOnce() -> Result<Corpus, E>,
    {
        let key = content_key(text);
        self.corpora.get_or_create(key, || {
            debug!("Building corpus for new transcript");
            builder()
        })
    }

    /// Number of distinct transcripts with a cached corpus.
    pub fn corpus_count(&self) -> usize {
        self.corpora.len()
    }

    pub fn summarizer_loaded(&self) -> bool {
        !self.summarizer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_stable_and_distinct() {
        assert_eq!(content_key("abc"), content_key("abc"));
        assert_ne!(content_key("abc"), content_key("abd"));
        assert_eq!(content_key("abc").len(), 64);
    }

    #[test]
    fn test_get_without_create() {
        let cache: ModelCache<u32, String> = ModelCache::new();
        assert!(cache.get(&1).is_none());
        let _ = cache.get_or_create(1, || Ok::<_, ()>("one".to_string()));
        assert_eq!(cache.get(&1).as_deref().map(String::as_str), Some("one"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_factory_leaves_no_slot_behind() {
        let cache: ModelCache<String, u32> = ModelCache::new();
        for text in ["a", "b", "c"] {
            let err = cache.get_or_create(text.to_string(), || Err::<u32, _>("empty"));
            assert!(err.is_err());
        }
        assert!(cache.slots.lock().unwrap().is_empty());

        // A later success for the same key still caches normally
        let value = cache.get_or_create("a".to_string(), || Ok::<_, &str>(1)).unwrap();
        assert_eq!(*value, 1);
        assert_eq!(cache.slots.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_summarizer_scope_returns_the_loaded_model() {
        struct Stub;
        impl SummaryModel for Stub {
            fn special_tokens(&self) -> crate::summarize::traits::SpecialTokens {
                crate::summarize::traits::SpecialTokens {
                    bos: 0,
                    eos: 2,
                    pad: 1,
                    decoder_start: 2,
                    forced_bos: None,
                }
            }
            fn context_window(&self) -> usize {
                16
            }
            fn tokenize(&self, _text: &str) -> anyhow::Result<Vec<u32>> {
                Ok(Vec::new())
            }
            fn detokenize(&self, _ids: &[u32]) -> anyhow::Result<String> {
                Ok(String::new())
            }
            fn encode(
                &self,
                _input_ids: &[u32],
            ) -> anyhow::Result<crate::summarize::traits::EncoderOutput> {
                anyhow::bail!("not used")
            }
            fn next_token_logits(
                &self,
                _encoded: &crate::summarize::traits::EncoderOutput,
                _decoder_ids: &[u32],
            ) -> anyhow::Result<Vec<f32>> {
                anyhow::bail!("not used")
            }
        }

        let resources = ResourceCache::new();
        let model: Arc<dyn SummaryModel> = Arc::new(Stub);
        let first = resources
            .summarizer(|| Ok::<_, anyhow::Error>(Arc::clone(&model)))
            .unwrap();
        let second = resources
            .summarizer(|| Err::<Arc<dyn SummaryModel>, _>(anyhow::anyhow!("reloaded")))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &model));
        assert!(Arc::ptr_eq(&second, &model));
        assert_eq!(first.context_window(), 16);
    }
}
