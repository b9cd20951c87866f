/*!
 * Token cost estimation for batch planning.
 *
 * A deterministic, purely local estimate of what a translation request
 * will cost: the prompt as a function of text length and language count,
 * and each candidate language's expected response via a per-language
 * expansion factor. The batch scheduler uses these numbers to decide how
 * many languages fit under the token budget before any network call is
 * made.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;

use crate::app_config::TokenConfig;

/// Tokens consumed by the fixed prompt instructions and example block
const PROMPT_OVERHEAD_TOKENS: u32 = 110;

/// Tokens added to the prompt per requested language (name in the list)
const PER_LANGUAGE_PROMPT_TOKENS: u32 = 4;

/// Tokens per language for the JSON key and quoting in the response
const RESPONSE_KEY_TOKENS: u32 = 6;

/// How much longer translated text tends to run than the English source.
/// Languages not listed use 1.0.
static EXPANSION_FACTORS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("german", 1.15),
        ("french", 1.10),
        ("italian", 1.10),
        ("spanish", 1.05),
        ("latam", 1.05),
        ("brazilian", 1.05),
        ("polish", 1.10),
        ("russian", 1.15),
        ("turkish", 1.05),
        ("japanese", 1.40),
        ("koreana", 1.30),
        ("schinese", 1.25),
        ("tchinese", 1.25),
    ])
});

/// Deterministic token estimator configured with the model ceiling
pub struct TokenEstimator {
    /// Model generation ceiling
    max_tokens: u32,

    /// Safety margin applied to the ceiling
    margin: f64,
}

impl TokenEstimator {
    /// Create an estimator from the token configuration
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            margin: config.margin,
        }
    }

    /// The budget a batch must stay under: `floor(max_tokens * margin)`
    pub fn max_allowed_tokens(&self) -> u32 {
        (self.max_tokens as f64 * self.margin).floor() as u32
    }

    /// Estimated prompt cost for translating `text` into `languages`
    pub fn estimate_prompt(&self, text: &str, languages: &[String]) -> u32 {
        PROMPT_OVERHEAD_TOKENS
            + text_tokens(text)
            + PER_LANGUAGE_PROMPT_TOKENS * languages.len() as u32
    }

    /// Estimated response cost for one language's translation
    pub fn estimate_response(&self, text: &str, language: &str) -> u32 {
        let factor = expansion_factor(language);
        let estimate = (text_tokens(text) as f64 * factor).ceil() as u32 + RESPONSE_KEY_TOKENS;
        debug!("[TOKEN] Estimated tokens for {}: {}", language, estimate);
        estimate
    }
}

/// Per-language expansion factor, 1.0 for unknown languages
pub fn expansion_factor(language: &str) -> f64 {
    EXPANSION_FACTORS.get(language).copied().unwrap_or(1.0)
}

/// Rough token count of a piece of English text.
/// Words expand to slightly more than one token each; text dense with
/// punctuation or markup runs higher still.
fn text_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count().max(1);
    let mut tokens = words as f64 * 1.2;
    if text
        .chars()
        .any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c))
    {
        tokens *= 1.1;
    }
    tokens.ceil() as u32
}
