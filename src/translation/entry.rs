/*!
 * Per-entry translation processing.
 *
 * One entry is one source text that must exist in every target language.
 * The processor computes which languages are still missing from the cache,
 * drives the batch scheduler until they are resolved or exhausted, then
 * emits whatever the cache now holds to the writer collaborator. Output
 * emission deliberately reads back from the cache rather than the
 * scheduler's return value: the cache is the durable record, and a
 * partially completed entry still writes out everything it has.
 */

use std::sync::Arc;

use log::{debug, warn};

use super::cache::TranslationCache;
use super::scheduler::BatchScheduler;
use crate::statistics::{Counter, Statistics};

/// Writer collaborator receiving resolved translations in header-column
/// order. The processor only supplies values it has already durably cached.
pub trait TranslationSink {
    /// Accept one `(entry_key, language, translation)` triple
    fn write(&mut self, entry_key: &str, language: &str, translation: &str);
}

/// What happened to a single entry
#[derive(Debug, Default)]
pub struct EntrySummary {
    /// Translations emitted to the sink
    pub written: usize,

    /// Languages newly resolved this run
    pub resolved: usize,

    /// Languages attempted and left untranslated this run
    pub failed: usize,
}

/// Processor for individual localization entries
pub struct EntryProcessor {
    cache: Arc<TranslationCache>,
    scheduler: BatchScheduler,
    stats: Arc<Statistics>,
}

impl EntryProcessor {
    /// Create a processor over the shared cache and a scheduler
    pub fn new(
        cache: Arc<TranslationCache>,
        scheduler: BatchScheduler,
        stats: Arc<Statistics>,
    ) -> Self {
        Self {
            cache,
            scheduler,
            stats,
        }
    }

    /// Process one entry: fill cache gaps, then write out every language
    /// now present in the cache for this text.
    pub async fn process(
        &self,
        entry_key: &str,
        text: &str,
        target_languages: &[String],
        sink: &mut dyn TranslationSink,
    ) -> EntrySummary {
        let mut summary = EntrySummary::default();

        if text.trim().is_empty() {
            debug!("[ENTRY] Skipping {} - empty source text", entry_key);
            return summary;
        }

        let missing = self.cache.missing(text, target_languages);
        if missing.is_empty() {
            debug!(
                "[ENTRY] All {} languages cached for {}",
                target_languages.len(),
                entry_key
            );
        } else {
            debug!(
                "[ENTRY] {} missing {} languages: {}",
                entry_key,
                missing.len(),
                missing.join(", ")
            );

            let outcome = self.scheduler.translate_entry(text, &missing).await;
            summary.resolved = outcome.resolved.len();
            summary.failed = outcome.failed.len();

            if summary.resolved > 0 {
                self.stats.increment(Counter::EntriesTranslated, 1);
                self.stats
                    .increment(Counter::TotalTranslations, summary.resolved as u64);
            }
            if summary.failed > 0 {
                warn!(
                    "[ENTRY] {} left {} of {} languages untranslated this run",
                    entry_key,
                    summary.failed,
                    missing.len()
                );
            }
        }

        // Write-out always reflects current cache state, decoupled from
        // how complete this particular run was
        let cached = self.cache.get(text);
        for language in target_languages {
            if let Some(translation) = cached.get(language) {
                sink.write(entry_key, language, translation);
                summary.written += 1;
            }
        }

        summary
    }
}
