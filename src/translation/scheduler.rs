/*!
 * Token-budget-aware batch scheduling.
 *
 * For each entry the scheduler repeatedly plans the largest prefix of the
 * still-missing languages whose estimated cost fits the token budget,
 * submits it as one call, and on failure halves the batch before falling
 * back to one-language-at-a-time calls. The halving bounds worst-case API
 * round trips while the single-language tier guarantees forward progress
 * even under persistent multi-language failures. Every successful
 * translation is written through to the cache immediately, so an
 * interrupted run keeps what it paid for.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, warn};

use super::cache::TranslationCache;
use super::estimator::TokenEstimator;
use crate::providers::gateway::TranslationGateway;

/// Per-entry scheduling result. Partial completion is a valid terminal
/// outcome; failed languages are simply absent from the cache this run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Languages resolved and durably cached
    pub resolved: Vec<String>,

    /// Languages attempted and given up on
    pub failed: Vec<String>,
}

impl BatchOutcome {
    /// Whether every requested language was resolved
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Scheduler driving gateway calls for one entry's missing languages
pub struct BatchScheduler {
    gateway: Arc<dyn TranslationGateway>,
    cache: Arc<TranslationCache>,
    estimator: TokenEstimator,
    cancel: Arc<AtomicBool>,

    /// Total attempts per planned batch: the initial call plus halvings
    batch_attempts: u32,
}

impl BatchScheduler {
    /// Create a scheduler over the given gateway and cache
    pub fn new(
        gateway: Arc<dyn TranslationGateway>,
        cache: Arc<TranslationCache>,
        estimator: TokenEstimator,
        cancel: Arc<AtomicBool>,
        batch_attempts: u32,
    ) -> Self {
        Self {
            gateway,
            cache,
            estimator,
            cancel,
            batch_attempts: batch_attempts.max(1),
        }
    }

    /// Resolve as many of `missing` as possible for `text`.
    ///
    /// Languages are worked through in the order given (header order).
    /// Cancellation is honored at every state transition; languages not
    /// yet attempted when the flag is raised are left out of the outcome
    /// entirely.
    pub async fn translate_entry(&self, text: &str, missing: &[String]) -> BatchOutcome {
        let mut remaining: Vec<String> = missing.to_vec();
        let mut outcome = BatchOutcome::default();
        let budget = self.estimator.max_allowed_tokens();

        while !remaining.is_empty() {
            if self.cancelled() {
                debug!("[BATCH] Cancellation requested, not starting a new batch");
                break;
            }

            let batch = self.plan_batch(text, &remaining, budget);
            if batch.is_empty() {
                // The next language alone blows the budget; a batch can
                // never carry it, so it goes straight to the single tier
                let language = remaining.remove(0);
                debug!(
                    "[TOKEN] {} exceeds the {}-token budget alone, using single fallback",
                    language, budget
                );
                self.single_fallback(text, std::slice::from_ref(&language), &mut outcome)
                    .await;
                continue;
            }

            match self.run_batch_with_halving(text, batch.clone()).await {
                Some(translations) => {
                    // The call may have satisfied only part of the batch;
                    // anything missing goes back through estimation
                    let mut stored = Vec::new();
                    let mut unpersisted = Vec::new();
                    for language in &batch {
                        let Some(translation) = translations.get(language) else {
                            continue;
                        };
                        match self.cache.put(text, language, translation) {
                            Ok(_) => stored.push(language.clone()),
                            Err(e) => {
                                error!("[CACHE] Failed to persist {} translation: {}", language, e);
                                unpersisted.push(language.clone());
                            }
                        }
                    }

                    if stored.is_empty() && unpersisted.is_empty() {
                        warn!("[BATCH] Batch call returned nothing usable, using single fallback");
                        self.single_fallback(text, &batch, &mut outcome).await;
                        remaining.retain(|l| !batch.contains(l));
                    } else {
                        remaining.retain(|l| !stored.contains(l) && !unpersisted.contains(l));
                        outcome.resolved.extend(stored);
                        outcome.failed.extend(unpersisted);
                    }
                }
                None => {
                    // All batch attempts exhausted; fall back to singles
                    // over the original un-halved batch
                    debug!(
                        "[BATCH] Switching to Single Language-Based Strategy for {} languages",
                        batch.len()
                    );
                    self.single_fallback(text, &batch, &mut outcome).await;
                    remaining.retain(|l| !batch.contains(l));
                }
            }

            if !remaining.is_empty() {
                debug!("[BATCH] Remaining languages: {}", remaining.join(", "));
            }
        }

        outcome
    }

    /// ESTIMATING: accumulate the longest header-order prefix of
    /// `remaining` whose prompt + response estimate stays within `budget`
    fn plan_batch(&self, text: &str, remaining: &[String], budget: u32) -> Vec<String> {
        let mut batch: Vec<String> = Vec::new();
        let mut responses_total = 0u32;

        for (index, language) in remaining.iter().enumerate() {
            let response = self.estimator.estimate_response(text, language);
            let prompt = self.estimator.estimate_prompt(text, &remaining[..=index]);
            let total = prompt + responses_total + response;

            if total > budget {
                if batch.is_empty() {
                    debug!(
                        "[TOKEN] {} does not fit within budget {} ({} estimated)",
                        language, budget, total
                    );
                }
                break;
            }

            responses_total += response;
            batch.push(language.clone());
            debug!("[TOKEN] Cumulative tokens for current batch: {}", total);
        }

        batch
    }

    /// BATCH_CALL / BATCH_RETRY: submit the batch, halving it (first half,
    /// header order) after each failure, up to `batch_attempts` total tries.
    /// Returns the successful response, or None once attempts are exhausted.
    async fn run_batch_with_halving(
        &self,
        text: &str,
        mut batch: Vec<String>,
    ) -> Option<std::collections::HashMap<String, String>> {
        for attempt in 1..=self.batch_attempts {
            if self.cancelled() {
                return None;
            }

            debug!(
                "[BATCH] Attempt {}/{} with {} languages: {}",
                attempt,
                self.batch_attempts,
                batch.len(),
                batch.join(", ")
            );

            match self.gateway.translate(text, &batch).await {
                Ok(translations) => return Some(translations),
                Err(e) => {
                    warn!("[BATCH] Batch of {} languages failed: {}", batch.len(), e);
                    if attempt < self.batch_attempts && batch.len() > 1 {
                        batch.truncate((batch.len() / 2).max(1));
                        debug!("[BATCH] Reducing batch size to {}", batch.len());
                    }
                }
            }
        }
        None
    }

    /// SINGLE_FALLBACK: one call per language, in header order. A failed
    /// language is recorded and skipped; it never blocks the rest.
    async fn single_fallback(&self, text: &str, languages: &[String], outcome: &mut BatchOutcome) {
        for language in languages {
            if self.cancelled() {
                debug!("[SINGLE] Cancellation requested, stopping fallback");
                return;
            }

            debug!("[SINGLE] Translating {}", language);
            match self
                .gateway
                .translate(text, std::slice::from_ref(language))
                .await
            {
                Ok(translations) => match translations.get(language) {
                    Some(translation) => match self.cache.put(text, language, translation) {
                        Ok(_) => outcome.resolved.push(language.clone()),
                        Err(e) => {
                            error!("[CACHE] Failed to persist {} translation: {}", language, e);
                            outcome.failed.push(language.clone());
                        }
                    },
                    None => {
                        warn!("[SINGLE] No translation returned for {}", language);
                        outcome.failed.push(language.clone());
                    }
                },
                Err(e) => {
                    error!("[SINGLE] Failed to translate {}: {}", language, e);
                    outcome.failed.push(language.clone());
                }
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}
