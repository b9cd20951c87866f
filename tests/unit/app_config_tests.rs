/*!
 * Tests for configuration loading, defaults, and validation.
 */

use tempfile::TempDir;

use loctrans::app_config::{Config, LogLevel};

#[test]
fn test_from_file_withMissingFile_shouldWriteDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::from_file(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.tokens.max_tokens, 1000);
    assert_eq!(config.tokens.margin, 0.65);
    assert_eq!(config.providers.retry_attempts, 3);
    assert_eq!(config.batch.batch_attempts, 3);
}

#[test]
fn test_from_file_withPartialConfig_shouldFillDefaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "tokens": { "max_tokens": 4000 },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.tokens.max_tokens, 4000);
    assert_eq!(config.tokens.margin, 0.65);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.providers.anthropic.enabled);
    assert_eq!(config.providers.openai.model, "gpt-3.5-turbo-0125");
}

#[test]
fn test_from_file_withInvalidValues_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{ "tokens": { "margin": 1.5 } }"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_from_file_withBrokenJson_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_cache_path_shouldHonorOverride() {
    let mut config = Config::default();
    config.cache_file = Some("/tmp/custom-cache.json".into());
    assert_eq!(
        config.cache_path(),
        std::path::PathBuf::from("/tmp/custom-cache.json")
    );
}

#[test]
fn test_resolved_api_key_shouldPreferExplicitKey() {
    let mut config = Config::default();
    config.providers.anthropic.api_key = "sk-explicit".to_string();
    assert_eq!(config.providers.anthropic.resolved_api_key(), "sk-explicit");
}
