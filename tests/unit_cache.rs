// Unit tests for the single-flight resource cache.
//
// Covers identity of cached values, exactly-once construction under
// concurrent callers, retry after a failed factory, and per-key isolation.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::ScriptedModel;
use transcript_lens::cache::{ModelCache, ResourceCache};
use transcript_lens::summarize::traits::SummaryModel;
use transcript_lens::topics::corpus;

// ============================================================
// ModelCache: identity and single flight
// ============================================================

#[test]
fn same_key_returns_same_instance() {
    let cache: ModelCache<&str, Vec<u8>> = ModelCache::new();
    let a = cache.get_or_create("k", || Ok::<_, ()>(vec![1, 2, 3])).unwrap();
    let b = cache.get_or_create("k", || Ok::<_, ()>(vec![9])).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*b, vec![1, 2, 3]);
}

#[test]
fn factory_runs_once_under_concurrent_callers() {
    const CALLERS: usize = 16;
    let cache: Arc<ModelCache<&str, String>> = Arc::new(ModelCache::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create("model", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Slow enough that the other callers arrive mid-build
                        thread::sleep(Duration::from_millis(50));
                        Ok::<_, ()>("loaded".to_string())
                    })
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[test]
fn failed_factory_is_retried() {
    let cache: ModelCache<&str, u32> = ModelCache::new();

    let err = cache.get_or_create("k", || Err::<u32, _>("not yet"));
    assert_eq!(err.unwrap_err(), "not yet");
    assert!(cache.get(&"k").is_none());
    assert!(cache.is_empty());

    let value = cache.get_or_create("k", || Ok::<_, &str>(7)).unwrap();
    assert_eq!(*value, 7);
    assert_eq!(cache.len(), 1);
}

#[test]
fn distinct_keys_are_independent() {
    let cache: ModelCache<String, usize> = ModelCache::new();
    let a = cache.get_or_create("a".into(), || Ok::<_, ()>(1)).unwrap();
    let b = cache.get_or_create("b".into(), || Ok::<_, ()>(2)).unwrap();
    assert_eq!((*a, *b), (1, 2));
    assert_eq!(cache.len(), 2);
}

// ============================================================
// ResourceCache: summarizer and corpus scopes
// ============================================================

#[test]
fn summarizer_is_loaded_once() {
    let resources = ResourceCache::new();
    let model: Arc<dyn SummaryModel> = Arc::new(ScriptedModel::new(5));
    let loads = AtomicUsize::new(0);

    assert!(!resources.summarizer_loaded());
    for _ in 0..3 {
        let got = resources
            .summarizer(|| {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(Arc::clone(&model))
            })
            .unwrap();
        assert!(Arc::ptr_eq(&got, &model));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(resources.summarizer_loaded());
}

#[test]
fn corpus_is_cached_per_document_text() {
    let resources = ResourceCache::new();
    let builds = AtomicUsize::new(0);
    let build = |words: &[&str]| {
        builds.fetch_add(1, Ordering::SeqCst);
        let tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        Ok::<_, ()>(corpus::build(&tokens))
    };

    let a1 = resources.corpus("cloud revenue", || build(&["cloud", "revenu"])).unwrap();
    let a2 = resources.corpus("cloud revenue", || build(&["ignored"])).unwrap();
    let b = resources.corpus("enterprise demand", || build(&["enterpris", "demand"])).unwrap();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(resources.corpus_count(), 2);
}
