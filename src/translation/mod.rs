/*!
 * Translation orchestration engine.
 *
 * This module contains the core machinery for filling localization files
 * with translations at minimal API cost. It is split into several
 * submodules:
 *
 * - `cache`: Durable, content-addressed translation cache
 * - `estimator`: Token cost estimation for batch planning
 * - `scheduler`: Budget-aware batching with halving retry and single-language fallback
 * - `entry`: Per-entry processing and write-out
 */

// Re-export main types for easier usage
pub use self::cache::TranslationCache;
pub use self::entry::{EntryProcessor, EntrySummary, TranslationSink};
pub use self::estimator::TokenEstimator;
pub use self::scheduler::{BatchOutcome, BatchScheduler};

// Submodules
pub mod cache;
pub mod entry;
pub mod estimator;
pub mod scheduler;
