/*!
 * Statistics collection for the translation run.
 *
 * The engine treats these counters as write-only: every cache hit/miss,
 * API outcome, and token count is pushed here and never read back for
 * control decisions. The counters are persisted as a sub-store of the
 * translation cache file, so totals accumulate across runs.
 */

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::info;

/// Counter names understood by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Localization files fully processed
    FilesProcessed,
    /// Entries that required at least one translation call
    EntriesTranslated,
    /// Successful provider calls
    ApiSuccess,
    /// Failed provider calls (including parse failures)
    ApiFail,
    /// Cumulative time spent in provider calls, in milliseconds
    ApiTimeMs,
    /// Cache lookups that found a translation
    CacheHits,
    /// Cache lookups that found nothing
    CacheMisses,
    /// Prompt tokens sent, as reported or estimated
    TotalPromptTokens,
    /// Response tokens received, as reported or estimated
    TotalResponseTokens,
    /// Individual language translations resolved
    TotalTranslations,
}

impl Counter {
    /// Stable name used in the persisted statistics sub-store
    pub fn name(self) -> &'static str {
        match self {
            Self::FilesProcessed => "files_processed",
            Self::EntriesTranslated => "entries_translated",
            Self::ApiSuccess => "api_success",
            Self::ApiFail => "api_fail",
            Self::ApiTimeMs => "api_time_ms",
            Self::CacheHits => "cache_hits",
            Self::CacheMisses => "cache_misses",
            Self::TotalPromptTokens => "total_prompt_tokens",
            Self::TotalResponseTokens => "total_response_tokens",
            Self::TotalTranslations => "total_translations",
        }
    }

    fn all() -> [Counter; 10] {
        [
            Self::FilesProcessed,
            Self::EntriesTranslated,
            Self::ApiSuccess,
            Self::ApiFail,
            Self::ApiTimeMs,
            Self::CacheHits,
            Self::CacheMisses,
            Self::TotalPromptTokens,
            Self::TotalResponseTokens,
            Self::TotalTranslations,
        ]
    }
}

/// Write-only statistics collector shared across worker tasks
pub struct Statistics {
    counters: [AtomicU64; 10],
    started_at: Instant,
}

impl Statistics {
    /// Create a collector with all counters zeroed
    pub fn new() -> Self {
        Self {
            counters: Default::default(),
            started_at: Instant::now(),
        }
    }

    /// Increment a counter by the given amount
    pub fn increment(&self, counter: Counter, amount: u64) {
        self.counters[Self::index(counter)].fetch_add(amount, Ordering::Relaxed);
    }

    /// Read a counter value
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[Self::index(counter)].load(Ordering::Relaxed)
    }

    /// Seed the counters from a previously persisted snapshot.
    /// Unknown names in the snapshot are ignored.
    pub fn seed(&self, snapshot: &BTreeMap<String, u64>) {
        for counter in Counter::all() {
            if let Some(value) = snapshot.get(counter.name()) {
                self.counters[Self::index(counter)].store(*value, Ordering::Relaxed);
            }
        }
    }

    /// Snapshot the counters for persistence alongside the cache entries
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        Counter::all()
            .iter()
            .map(|c| (c.name().to_string(), self.get(*c)))
            .collect()
    }

    /// Log an end-of-run summary at INFO level
    pub fn log_summary(&self) {
        let elapsed = self.started_at.elapsed();
        let api_calls = self.get(Counter::ApiSuccess) + self.get(Counter::ApiFail);
        let lookups = self.get(Counter::CacheHits) + self.get(Counter::CacheMisses);
        let hit_rate = if lookups > 0 {
            self.get(Counter::CacheHits) as f64 / lookups as f64 * 100.0
        } else {
            0.0
        };

        info!("Run summary:");
        info!("  Files processed:      {}", self.get(Counter::FilesProcessed));
        info!("  Entries translated:   {}", self.get(Counter::EntriesTranslated));
        info!("  Translations stored:  {}", self.get(Counter::TotalTranslations));
        info!(
            "  API calls:            {} ({} ok, {} failed)",
            api_calls,
            self.get(Counter::ApiSuccess),
            self.get(Counter::ApiFail)
        );
        info!(
            "  API time:             {:.1}s",
            self.get(Counter::ApiTimeMs) as f64 / 1000.0
        );
        info!(
            "  Tokens:               {} prompt, {} response",
            self.get(Counter::TotalPromptTokens),
            self.get(Counter::TotalResponseTokens)
        );
        info!(
            "  Cache:                {} hits, {} misses ({:.1}% hit rate)",
            self.get(Counter::CacheHits),
            self.get(Counter::CacheMisses),
            hit_rate
        );
        info!("  Wall time:            {:.1}s", elapsed.as_secs_f64());
    }

    fn index(counter: Counter) -> usize {
        match counter {
            Counter::FilesProcessed => 0,
            Counter::EntriesTranslated => 1,
            Counter::ApiSuccess => 2,
            Counter::ApiFail => 3,
            Counter::ApiTimeMs => 4,
            Counter::CacheHits => 5,
            Counter::CacheMisses => 6,
            Counter::TotalPromptTokens => 7,
            Counter::TotalResponseTokens => 8,
            Counter::TotalTranslations => 9,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
