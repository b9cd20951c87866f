/*!
 * # loctrans - Localization Translator
 *
 * A Rust library for translating game localization files into many
 * languages at once using pay-per-token AI providers, while minimizing
 * cost and avoiding duplicate queries.
 *
 * ## Features
 *
 * - Recursive discovery of Localization.txt files
 * - Durable, content-addressed translation cache (write-through, crash safe)
 * - Token-budget-aware batching with a two-tier fallback strategy
 * - Dual-provider gateway (Anthropic, OpenAI) with sliding-window rate
 *   limiting, retry/backoff, and provider alternation
 * - Quote/escape-preserving re-serialization of localization files
 * - Graceful Ctrl-C handling that never loses a paid translation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `localization`: Localization file parsing and writing
 * - `translation`: The orchestration engine:
 *   - `translation::cache`: Durable translation cache
 *   - `translation::estimator`: Token cost estimation
 *   - `translation::scheduler`: Budget-aware batch scheduling
 *   - `translation::entry`: Per-entry processing
 * - `providers`: Clients and gateway for the remote providers:
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::gateway`: Validation, alternation, retry
 *   - `providers::response`: Response parsing and repair
 * - `rate_limiter`: Sliding-window admission control
 * - `statistics`: Run counters
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: Language key canonicalization
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod localization;
pub mod providers;
pub mod rate_limiter;
pub mod statistics;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, CacheError, LocalizationError, ProviderError};
pub use localization::{LocalizationEntry, LocalizationFile, LocalizationWriter};
pub use statistics::{Counter, Statistics};
pub use translation::{BatchScheduler, EntryProcessor, TokenEstimator, TranslationCache};
