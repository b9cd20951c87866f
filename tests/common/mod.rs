/*!
 * Common test utilities.
 *
 * Provides a scripted gateway so the scheduler and entry processor can be
 * exercised without any external API calls, plus helpers for building the
 * other engine pieces against temporary storage.
 */

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use loctrans::app_config::TokenConfig;
use loctrans::errors::ProviderError;
use loctrans::providers::gateway::TranslationGateway;

/// Scripted replacement for the provider gateway.
///
/// Records every call it receives and answers according to a small set of
/// failure knobs. A successful translation for language L of text T is the
/// string `"L:T"`, which keeps assertions self-describing.
#[derive(Default)]
pub struct MockGateway {
    /// Languages of every call, in call order
    pub calls: Mutex<Vec<Vec<String>>>,

    /// Fail this many calls outright before behaving normally
    pub fail_first_calls: AtomicUsize,

    /// Fail every call that carries more than one language
    pub fail_batch_calls: bool,

    /// Languages whose translation never succeeds
    pub failing_languages: HashSet<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that fails the first `n` calls with a transport error
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first_calls: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Gateway where multi-language calls always fail
    pub fn batches_always_fail() -> Self {
        Self {
            fail_batch_calls: true,
            ..Self::default()
        }
    }

    /// Mark a language as permanently failing
    pub fn with_failing_language(mut self, language: &str) -> Self {
        self.failing_languages.insert(language.to_string());
        self
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Language counts of each call, in order
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.len()).collect()
    }
}

#[async_trait]
impl TranslationGateway for MockGateway {
    async fn translate(
        &self,
        text: &str,
        languages: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        self.calls.lock().unwrap().push(languages.to_vec());

        if self
            .fail_first_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::RequestFailed("scripted failure".to_string()));
        }

        if self.fail_batch_calls && languages.len() > 1 {
            return Err(ProviderError::RequestFailed(
                "scripted batch failure".to_string(),
            ));
        }

        let translations: HashMap<String, String> = languages
            .iter()
            .filter(|language| !self.failing_languages.contains(*language))
            .map(|language| (language.clone(), format!("{}:{}", language, text)))
            .collect();

        if translations.is_empty() {
            return Err(ProviderError::RequestFailed(format!(
                "scripted failure for languages [{}]",
                languages.join(", ")
            )));
        }

        Ok(translations)
    }
}

/// Token config sized so that any realistic test batch fits
pub fn roomy_token_config() -> TokenConfig {
    TokenConfig {
        max_tokens: 100_000,
        margin: 0.65,
    }
}

/// Token config so tight only one language fits per call for short texts
pub fn tight_token_config() -> TokenConfig {
    TokenConfig {
        max_tokens: 200,
        margin: 0.65,
    }
}

/// Token config under which no language fits in a batch at all
pub fn micro_token_config() -> TokenConfig {
    TokenConfig {
        max_tokens: 150,
        margin: 0.65,
    }
}

/// Header-ordered language list helper
pub fn languages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Route engine logs through env_logger so failing tests can be rerun
/// with RUST_LOG=debug for the [TOKEN]/[BATCH] traces
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
