/*!
 * Durable translation cache.
 *
 * Content-addressed store mapping (normalized source text, language) to a
 * translation. Every insert is written through to a single JSON store file
 * together with the statistics sub-store, atomically (write to a temp file,
 * then rename), so an interrupted run never corrupts previously persisted
 * entries. A store that fails to load is logged and replaced with an empty
 * one - the engine proceeds with a cold cache rather than abort.
 */

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::errors::CacheError;
use crate::statistics::{Counter, Statistics};

/// On-disk layout of the store: one atomic unit holding the translations
/// and the statistics sub-store. JSON string escaping keeps embedded
/// quotes and newlines reversible.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheStore {
    /// source text -> language -> translation
    entries: BTreeMap<String, BTreeMap<String, String>>,

    /// Persisted statistics counters
    #[serde(default)]
    statistics: BTreeMap<String, u64>,
}

/// Thread-safe, write-through translation cache
pub struct TranslationCache {
    /// In-memory store, shared-read / exclusive-write
    store: RwLock<CacheStore>,

    /// Path of the durable store file
    path: PathBuf,

    /// Serializes persistence: exactly one writer saves at a time
    save_lock: Mutex<()>,

    /// Statistics collaborator for hit/miss counters
    stats: Arc<Statistics>,
}

impl TranslationCache {
    /// Load the cache from `path`, creating an empty store if the file is
    /// absent or corrupt. Fails only if the store's directory cannot be
    /// created - without a writable location nothing can be persisted.
    pub fn load(path: PathBuf, stats: Arc<Statistics>) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<CacheStore>(&contents) {
                Ok(store) => {
                    info!("Cache loaded with {} entries from {}", store.entries.len(), path.display());
                    store
                }
                Err(e) => {
                    warn!(
                        "[CACHE] Store at {} is corrupt ({}), starting with an empty cache",
                        path.display(),
                        e
                    );
                    CacheStore::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing cache found. Starting with an empty cache.");
                CacheStore::default()
            }
            Err(e) => {
                warn!(
                    "[CACHE] Store at {} is unreadable ({}), starting with an empty cache",
                    path.display(),
                    e
                );
                CacheStore::default()
            }
        };

        stats.seed(&store.statistics);

        Ok(Self {
            store: RwLock::new(store),
            path,
            save_lock: Mutex::new(()),
            stats,
        })
    }

    /// All cached translations for a source text; empty if none
    pub fn get(&self, text: &str) -> BTreeMap<String, String> {
        let key = text.trim();
        let store = self.store.read();
        match store.entries.get(key) {
            Some(translations) => {
                self.stats.increment(Counter::CacheHits, 1);
                translations.clone()
            }
            None => {
                self.stats.increment(Counter::CacheMisses, 1);
                BTreeMap::new()
            }
        }
    }

    /// Single-language lookup
    pub fn get_language(&self, text: &str, language: &str) -> Option<String> {
        let key = text.trim();
        let store = self.store.read();
        let found = store
            .entries
            .get(key)
            .and_then(|translations| translations.get(language))
            .cloned();
        match found {
            Some(translation) => {
                self.stats.increment(Counter::CacheHits, 1);
                Some(translation)
            }
            None => {
                self.stats.increment(Counter::CacheMisses, 1);
                None
            }
        }
    }

    /// Insert a translation and persist the store.
    ///
    /// Text and translation are trimmed before keying. Writing an existing
    /// key is a no-op - entries are immutable once written. Returns whether
    /// a new entry was actually inserted.
    pub fn put(&self, text: &str, language: &str, translation: &str) -> Result<bool, CacheError> {
        let key = text.trim().to_string();
        let value = translation.trim().to_string();

        let inserted = {
            let mut store = self.store.write();
            let entry = store.entries.entry(key).or_default();
            if entry.contains_key(language) {
                debug!("[CACHE] Key already present for language {}, skipping", language);
                false
            } else {
                entry.insert(language.to_string(), value);
                true
            }
        };

        if inserted {
            debug!("[CACHE] Stored {} translation for '{}'", language, truncate(text, 40));
            self.flush()?;
        }
        Ok(inserted)
    }

    /// Languages from `all_languages` not yet cached for `text`, in the
    /// order `all_languages` lists them
    pub fn missing(&self, text: &str, all_languages: &[String]) -> Vec<String> {
        let key = text.trim();
        let store = self.store.read();
        let cached = store.entries.get(key);

        let mut missing = Vec::new();
        for language in all_languages {
            let present = cached.is_some_and(|translations| translations.contains_key(language));
            if present {
                self.stats.increment(Counter::CacheHits, 1);
            } else {
                self.stats.increment(Counter::CacheMisses, 1);
                missing.push(language.clone());
            }
        }
        missing
    }

    /// Number of source texts with at least one cached translation
    pub fn len(&self) -> usize {
        self.store.read().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.store.read().entries.is_empty()
    }

    /// Remove every entry and persist the empty store
    pub fn clear(&self) -> Result<(), CacheError> {
        {
            let mut store = self.store.write();
            store.entries.clear();
        }
        info!("Translation cache cleared");
        self.flush()
    }

    /// Persist the store atomically: serialize a snapshot, write it to a
    /// temp file in the same directory, then rename over the store path.
    pub fn flush(&self) -> Result<(), CacheError> {
        let _guard = self.save_lock.lock();

        let serialized = {
            let mut store = self.store.write();
            store.statistics = self.stats.snapshot();
            serde_json::to_vec_pretty(&*store)?
        };

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serialized)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    /// Path of the durable store file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
