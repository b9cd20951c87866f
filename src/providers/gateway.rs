/*!
 * Dual-provider API gateway.
 *
 * Executes translation requests against one of the two remote providers.
 * Providers are validated once at startup with a cheap probe call; an
 * invalid provider is never selected again for the process lifetime.
 * Selection between two healthy providers is random so neither key's
 * quota starves, but after a failed attempt the gateway deterministically
 * switches to the other valid provider for the retry.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, error, info, warn};

use super::anthropic::Anthropic;
use super::openai::OpenAi;
use super::response::ResponseParser;
use super::{Completion, Provider, ProviderKind};
use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::rate_limiter::RateLimiter;
use crate::statistics::{Counter, Statistics};

/// Capability interface the batch scheduler depends on.
///
/// One method: translate a text into a set of languages, returning whatever
/// subset of them the provider managed to produce.
#[async_trait]
pub trait TranslationGateway: Send + Sync {
    /// Translate `text` into each of `languages`
    async fn translate(
        &self,
        text: &str,
        languages: &[String],
    ) -> Result<HashMap<String, String>, ProviderError>;
}

/// Configured provider client, one of the two supported services
#[derive(Debug)]
enum ProviderClient {
    Anthropic(Anthropic),
    OpenAi(OpenAi),
}

impl ProviderClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderError> {
        match self {
            Self::Anthropic(client) => client.complete(prompt, max_tokens).await,
            Self::OpenAi(client) => client.complete(prompt, max_tokens).await,
        }
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        match self {
            Self::Anthropic(client) => client.probe().await,
            Self::OpenAi(client) => client.probe().await,
        }
    }
}

/// Rate-limited, retrying gateway over the two translation providers
pub struct ProviderGateway {
    /// Anthropic client, if configured
    anthropic: Option<ProviderClient>,

    /// OpenAI client, if configured
    openai: Option<ProviderClient>,

    /// Validation verdicts, set once before worker tasks start
    anthropic_valid: bool,
    openai_valid: bool,

    /// Per-provider sliding-window admission
    limiter: RateLimiter,

    /// Statistics collaborator
    stats: Arc<Statistics>,

    /// Total attempts per translate call, including the first
    max_attempts: u32,

    /// Base backoff between attempts, doubled each retry
    backoff_base_ms: u64,

    /// Generation ceiling passed to the providers
    max_tokens: u32,
}

impl ProviderGateway {
    /// Build the gateway from configuration. Providers start UNVALIDATED;
    /// call [`validate`](Self::validate) before handing the gateway to
    /// worker tasks.
    pub fn new(config: &Config, stats: Arc<Statistics>) -> Self {
        let anthropic_cfg = &config.providers.anthropic;
        let openai_cfg = &config.providers.openai;

        let anthropic = anthropic_cfg.enabled.then(|| {
            ProviderClient::Anthropic(Anthropic::new(
                anthropic_cfg.resolved_api_key(),
                anthropic_cfg.endpoint.clone(),
                anthropic_cfg.model.clone(),
                anthropic_cfg.timeout_secs,
            ))
        });
        let openai = openai_cfg.enabled.then(|| {
            ProviderClient::OpenAi(OpenAi::new(
                openai_cfg.resolved_api_key(),
                openai_cfg.endpoint.clone(),
                openai_cfg.model.clone(),
                openai_cfg.timeout_secs,
            ))
        });

        let limiter = RateLimiter::new(
            anthropic_cfg.throttle_max_calls as usize,
            Duration::from_secs(anthropic_cfg.throttle_time_frame_secs),
            openai_cfg.throttle_max_calls as usize,
            Duration::from_secs(openai_cfg.throttle_time_frame_secs),
        );

        Self {
            anthropic,
            openai,
            anthropic_valid: false,
            openai_valid: false,
            limiter,
            stats,
            max_attempts: config.providers.retry_attempts,
            backoff_base_ms: config.providers.retry_backoff_ms,
            max_tokens: config.tokens.max_tokens,
        }
    }

    /// Probe every configured provider and record the verdicts.
    ///
    /// Fails with `NoProviderAvailable` when neither provider validates -
    /// the run cannot do useful work without at least one.
    pub async fn validate(&mut self) -> Result<(), ProviderError> {
        self.anthropic_valid = self
            .probe_provider(ProviderKind::Anthropic)
            .await;
        self.openai_valid = self.probe_provider(ProviderKind::OpenAi).await;

        if !self.anthropic_valid && !self.openai_valid {
            error!("[API] No provider passed validation");
            return Err(ProviderError::NoProviderAvailable);
        }
        Ok(())
    }

    async fn probe_provider(&self, kind: ProviderKind) -> bool {
        let Some(client) = self.client(kind) else {
            info!("[API] {} provider not configured, skipping validation", kind);
            return false;
        };

        let permit = match self.limiter.acquire(kind).await {
            Ok(permit) => permit,
            Err(e) => {
                error!("[API] {} validation could not acquire a slot: {}", kind, e);
                return false;
            }
        };

        let result = client.probe().await;
        drop(permit);

        match result {
            Ok(()) => {
                info!("[API] {} API key validated successfully", kind);
                true
            }
            Err(e) => {
                error!("[API] {} API key validation failed: {}. Disabling provider.", kind, e);
                false
            }
        }
    }

    /// Whether the given provider passed validation
    pub fn is_valid(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Anthropic => self.anthropic_valid,
            ProviderKind::OpenAi => self.openai_valid,
        }
    }

    /// Remaining admission slots for a provider's current window
    pub fn remaining_calls(&self, kind: ProviderKind) -> usize {
        self.limiter.remaining_calls(kind)
    }

    fn client(&self, kind: ProviderKind) -> Option<&ProviderClient> {
        match kind {
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::OpenAi => self.openai.as_ref(),
        }
    }

    /// Pick a provider for a fresh call: random between two valid ones,
    /// the sole valid one otherwise
    fn pick_provider(&self) -> Result<ProviderKind, ProviderError> {
        match (self.anthropic_valid, self.openai_valid) {
            (true, true) => Ok(if rand::random::<bool>() {
                ProviderKind::Anthropic
            } else {
                ProviderKind::OpenAi
            }),
            (true, false) => Ok(ProviderKind::Anthropic),
            (false, true) => Ok(ProviderKind::OpenAi),
            (false, false) => Err(ProviderError::NoProviderAvailable),
        }
    }

    /// Build the translation prompt sent to either provider
    fn build_prompt(text: &str, languages: &[String]) -> String {
        let language_list = languages.join(", ");
        format!(
            "Respond only with a JSON object where each key is a language code and its value is the translation.\n\
             Do not include the original text or any additional fields in the response. Do not repeat yourself.\n\
             Preserve all '\\n' sequences as they represent linefeeds. Do not convert '\\n' to actual linefeeds.\n\
             \n\
             Example format:\n\
             {{\n\
                 \"german\": \"German translation here\",\n\
                 \"french\": \"French translation here\"\n\
             }}\n\
             \n\
             Translate the text below to {language_list}.\n\
             Text to translate: {text}"
        )
    }

    async fn attempt_call(
        &self,
        provider: ProviderKind,
        text: &str,
        languages: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        let client = self
            .client(provider)
            .ok_or(ProviderError::NoProviderAvailable)?;

        // Scoped acquisition: the permit is released on every exit path
        let permit = self.limiter.acquire(provider).await?;
        let prompt = Self::build_prompt(text, languages);
        let started = Instant::now();
        let result = client.complete(&prompt, self.max_tokens).await;
        drop(permit);

        let elapsed = started.elapsed();
        self.stats
            .increment(Counter::ApiTimeMs, elapsed.as_millis() as u64);

        let completion = result?;
        if let Some(prompt_tokens) = completion.prompt_tokens {
            self.stats
                .increment(Counter::TotalPromptTokens, prompt_tokens);
        }
        if let Some(completion_tokens) = completion.completion_tokens {
            self.stats
                .increment(Counter::TotalResponseTokens, completion_tokens);
        }

        debug!(
            "[API] {} responded in {:.2}s for {} languages",
            provider,
            elapsed.as_secs_f64(),
            languages.len()
        );

        ResponseParser::parse(&completion.text, languages)
    }
}

#[async_trait]
impl TranslationGateway for ProviderGateway {
    async fn translate(
        &self,
        text: &str,
        languages: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        let mut provider = self.pick_provider()?;
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                // Deterministic fallback under failure: always try the
                // other provider next if it is healthy
                if self.is_valid(provider.other()) {
                    provider = provider.other();
                }
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 2));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }

            debug!(
                "[API] Attempt {}/{} using {} for languages: {}",
                attempt,
                self.max_attempts,
                provider,
                languages.join(", ")
            );

            match self.attempt_call(provider, text, languages).await {
                Ok(translations) => {
                    self.stats.increment(Counter::ApiSuccess, 1);
                    debug!(
                        "[API] Received {} of {} requested translations",
                        translations.len(),
                        languages.len()
                    );
                    return Ok(translations);
                }
                Err(e) => {
                    self.stats.increment(Counter::ApiFail, 1);
                    warn!("[API] {} attempt {} failed: {}", provider, attempt, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ProviderError::Exhausted {
            provider: provider.display_name().to_string(),
            attempts: self.max_attempts,
            languages: languages.join(", "),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
