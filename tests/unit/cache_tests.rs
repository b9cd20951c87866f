/*!
 * Tests for the durable translation cache: concurrent write-through,
 * statistics persistence, and corruption recovery.
 */

use std::sync::Arc;

use tempfile::TempDir;

use loctrans::statistics::{Counter, Statistics};
use loctrans::translation::TranslationCache;

#[test]
fn test_concurrent_puts_withDifferentKeys_shouldLoseNothing() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(
        TranslationCache::load(dir.path().join("cache.json"), Arc::new(Statistics::new()))
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for entry in 0..10 {
                    let text = format!("text {}-{}", worker, entry);
                    cache.put(&text, "german", "value").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 80);

    // Everything survived the interleaved write-throughs on disk too
    let reloaded = TranslationCache::load(
        dir.path().join("cache.json"),
        Arc::new(Statistics::new()),
    )
    .unwrap();
    assert_eq!(reloaded.len(), 80);
}

#[test]
fn test_statistics_substore_shouldPersistWithEntries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");

    {
        let stats = Arc::new(Statistics::new());
        let cache = TranslationCache::load(path.clone(), stats.clone()).unwrap();
        stats.increment(Counter::ApiSuccess, 5);
        stats.increment(Counter::TotalPromptTokens, 321);
        cache.put("Hello", "german", "Hallo").unwrap();
    }

    // A fresh run seeds its counters from the persisted sub-store
    let stats = Arc::new(Statistics::new());
    let _cache = TranslationCache::load(path, stats.clone()).unwrap();
    assert_eq!(stats.get(Counter::ApiSuccess), 5);
    assert_eq!(stats.get(Counter::TotalPromptTokens), 321);
}

#[test]
fn test_load_withCorruptStore_shouldRecoverAndStayWritable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{\"entries\": [this is not valid").unwrap();

    let cache =
        TranslationCache::load(path.clone(), Arc::new(Statistics::new())).unwrap();
    assert!(cache.is_empty());

    // The recovered store accepts writes and persists them
    cache.put("Hello", "german", "Hallo").unwrap();
    let reloaded = TranslationCache::load(path, Arc::new(Statistics::new())).unwrap();
    assert_eq!(
        reloaded.get_language("Hello", "german").as_deref(),
        Some("Hallo")
    );
}

#[test]
fn test_missing_withPartiallyCachedEntry_shouldCountHitsAndMisses() {
    let dir = TempDir::new().unwrap();
    let stats = Arc::new(Statistics::new());
    let cache =
        TranslationCache::load(dir.path().join("cache.json"), stats.clone()).unwrap();
    let all = vec![
        "german".to_string(),
        "french".to_string(),
        "japanese".to_string(),
    ];

    cache.put("Hello", "german", "Hallo").unwrap();
    let missing = cache.missing("Hello", &all);

    assert_eq!(missing, vec!["french", "japanese"]);
    assert_eq!(stats.get(Counter::CacheHits), 1);
    assert_eq!(stats.get(Counter::CacheMisses), 2);
}
