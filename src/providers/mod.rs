/*!
 * Provider implementations for the remote translation services.
 *
 * This module contains client implementations for the two supported
 * providers:
 * - Anthropic: Anthropic messages API
 * - OpenAI: OpenAI chat completions API
 *
 * The clients are interchangeable behind the [`Provider`] trait; selection,
 * validation, and alternation between them live in [`gateway`].
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// The two interchangeable remote translation services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Anthropic messages API
    Anthropic,
    /// OpenAI chat completions API
    OpenAi,
}

impl ProviderKind {
    /// Capitalized provider name for logs and error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAi => "OpenAI",
        }
    }

    /// The other provider
    pub fn other(&self) -> ProviderKind {
        match self {
            Self::Anthropic => Self::OpenAi,
            Self::OpenAi => Self::Anthropic,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A completed provider request with whatever usage data the API reported
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw text of the model's reply
    pub text: String,

    /// Prompt tokens consumed, if the API reported them
    pub prompt_tokens: Option<u64>,

    /// Completion tokens generated, if the API reported them
    pub completion_tokens: Option<u64>,
}

/// Common trait for the provider clients
///
/// This trait defines the interface both provider implementations follow,
/// allowing them to be used interchangeably by the gateway.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a single prompt against this provider
    ///
    /// # Arguments
    /// * `prompt` - The full prompt to send
    /// * `max_tokens` - Generation ceiling for the reply
    ///
    /// # Returns
    /// * `Result<Completion, ProviderError>` - The reply or an error
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderError>;

    /// Cheap probe call used to validate the API key at startup
    async fn probe(&self) -> Result<(), ProviderError>;
}

pub mod anthropic;
pub mod gateway;
pub mod openai;
pub mod response;
