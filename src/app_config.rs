use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings. The configuration is
/// immutable after startup; components receive it by reference.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Provider settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Token budget settings
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Batch scheduling settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Maximum number of files processed concurrently
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Durable cache store path; defaults to the user cache directory
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity levels
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: log crate level filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Settings for both providers plus the shared retry policy
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProvidersConfig {
    // @field: Anthropic provider settings
    #[serde(default = "ProviderConfig::default_anthropic")]
    pub anthropic: ProviderConfig,

    // @field: OpenAI provider settings
    #[serde(default = "ProviderConfig::default_openai")]
    pub openai: ProviderConfig,

    // @field: Attempts per translate call, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    // @field: Base backoff between attempts, doubled each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::default_anthropic(),
            openai: ProviderConfig::default_openai(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Per-provider connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Whether this provider may be used at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    // @field: API key; falls back to the environment variable below
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Environment variable consulted when api_key is empty
    #[serde(default = "String::new")]
    pub api_key_env: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Service URL, empty for the public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Max calls admitted per rate-limit window
    #[serde(default = "default_throttle_max_calls")]
    pub throttle_max_calls: u32,

    // @field: Rate-limit window length in seconds
    #[serde(default = "default_throttle_time_frame_secs")]
    pub throttle_time_frame_secs: u64,
}

impl ProviderConfig {
    // @returns: Anthropic provider defaults
    pub fn default_anthropic() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            throttle_max_calls: default_throttle_max_calls(),
            throttle_time_frame_secs: default_throttle_time_frame_secs(),
        }
    }

    // @returns: OpenAI provider defaults
    pub fn default_openai() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo-0125".to_string(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            throttle_max_calls: default_throttle_max_calls(),
            throttle_time_frame_secs: default_throttle_time_frame_secs(),
        }
    }

    /// The configured key, or the environment fallback
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        if self.api_key_env.is_empty() {
            return String::new();
        }
        std::env::var(&self.api_key_env).unwrap_or_default()
    }
}

/// Token budget configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
    /// Model generation ceiling per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Fraction of the ceiling a batch may plan for; the rest absorbs
    /// estimation error
    #[serde(default = "default_token_margin")]
    pub margin: f64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            margin: default_token_margin(),
        }
    }
}

/// Batch scheduling configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Attempts per planned batch: the initial call plus halvings
    #[serde(default = "default_batch_attempts")]
    pub batch_attempts: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_attempts: default_batch_attempts(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, writing defaults there first
    /// if it does not exist yet
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Created default configuration at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::file_utils::FileManager::ensure_dir(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.providers.anthropic.enabled && !self.providers.openai.enabled {
            return Err(anyhow!("At least one provider must be enabled"));
        }
        for (name, provider) in [
            ("anthropic", &self.providers.anthropic),
            ("openai", &self.providers.openai),
        ] {
            if !provider.endpoint.is_empty() {
                url::Url::parse(&provider.endpoint).map_err(|e| {
                    anyhow!("providers.{}.endpoint is not a valid URL: {}", name, e)
                })?;
            }
        }
        if self.tokens.max_tokens == 0 {
            return Err(anyhow!("tokens.max_tokens must be greater than zero"));
        }
        if !(self.tokens.margin > 0.0 && self.tokens.margin <= 1.0) {
            return Err(anyhow!(
                "tokens.margin must be within (0, 1], got {}",
                self.tokens.margin
            ));
        }
        if self.providers.retry_attempts == 0 {
            return Err(anyhow!("providers.retry_attempts must be at least 1"));
        }
        if self.batch.batch_attempts == 0 {
            return Err(anyhow!("batch.batch_attempts must be at least 1"));
        }
        if self.max_workers == 0 {
            return Err(anyhow!("max_workers must be at least 1"));
        }
        Ok(())
    }

    /// Resolved path of the durable cache store
    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_file {
            Some(path) => path.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("loctrans")
                .join("translation_cache.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            tokens: TokenConfig::default(),
            batch: BatchConfig::default(),
            max_workers: default_max_workers(),
            cache_file: None,
            log_level: LogLevel::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_throttle_max_calls() -> u32 {
    10
}

fn default_throttle_time_frame_secs() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_token_margin() -> f64 {
    0.65
}

fn default_batch_attempts() -> u32 {
    3
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
