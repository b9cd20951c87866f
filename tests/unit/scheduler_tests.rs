/*!
 * Tests for the batch scheduler state machine:
 * estimation-based batching, halving retry, and single-language fallback.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;

use loctrans::app_config::TokenConfig;
use loctrans::statistics::Statistics;
use loctrans::translation::{BatchScheduler, TokenEstimator, TranslationCache};

use crate::common::{
    MockGateway, languages, micro_token_config, roomy_token_config, tight_token_config,
};

struct Fixture {
    scheduler: BatchScheduler,
    gateway: Arc<MockGateway>,
    cache: Arc<TranslationCache>,
    cancel: Arc<AtomicBool>,
    _dir: TempDir,
}

fn fixture(gateway: MockGateway, tokens: TokenConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let stats = Arc::new(Statistics::new());
    let cache = Arc::new(
        TranslationCache::load(dir.path().join("cache.json"), stats).unwrap(),
    );
    let gateway = Arc::new(gateway);
    let cancel = Arc::new(AtomicBool::new(false));
    let scheduler = BatchScheduler::new(
        gateway.clone(),
        cache.clone(),
        TokenEstimator::new(&tokens),
        cancel.clone(),
        3,
    );
    Fixture {
        scheduler,
        gateway,
        cache,
        cancel,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_translate_entry_withRoomyBudget_shouldUseSingleBatchCall() {
    let f = fixture(MockGateway::new(), roomy_token_config());
    let missing = languages(&["german", "french"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    assert_eq!(f.gateway.call_count(), 1);
    assert_eq!(f.gateway.call_sizes(), vec![2]);
    assert_eq!(outcome.resolved, missing);
    assert!(outcome.is_complete());
    assert_eq!(
        f.cache.get_language("Hello", "german").as_deref(),
        Some("german:Hello")
    );
    assert_eq!(
        f.cache.get_language("Hello", "french").as_deref(),
        Some("french:Hello")
    );
}

#[tokio::test]
async fn test_translate_entry_withTightBudget_shouldSplitIntoMultipleBatches() {
    let f = fixture(MockGateway::new(), tight_token_config());
    let missing = languages(&["german", "french", "spanish"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    // Each call carries only what fits under the budget
    assert!(f.gateway.call_count() >= 2);
    for size in f.gateway.call_sizes() {
        assert!(size < 3);
    }
    assert!(outcome.is_complete());
    assert_eq!(outcome.resolved.len(), 3);
}

#[tokio::test]
async fn test_translate_entry_withPersistentBatchFailure_shouldHalveDownToSingles() {
    let f = fixture(MockGateway::batches_always_fail(), roomy_token_config());
    let missing = languages(&["german", "french", "japanese", "polish"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    // Halving sequence 4 -> 2 -> 1; the size-1 retry succeeds, the three
    // languages it did not carry resolve through later rounds
    let sizes = f.gateway.call_sizes();
    assert_eq!(&sizes[..2], &[4, 2]);
    assert!(outcome.is_complete());
    assert_eq!(outcome.resolved.len(), 4);
    for language in &missing {
        assert!(f.cache.get_language("Hello", language).is_some());
    }
}

#[tokio::test]
async fn test_translate_entry_withAllCallsFailing_shouldExhaustWithinThreeBatchAttempts() {
    let f = fixture(
        MockGateway::batches_always_fail()
            .with_failing_language("german")
            .with_failing_language("french")
            .with_failing_language("japanese")
            .with_failing_language("polish"),
        roomy_token_config(),
    );
    let missing = languages(&["german", "french", "japanese", "polish"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    // 3 batch attempts (4, 2, 1 languages), then one single call per
    // language of the original un-halved batch
    assert_eq!(f.gateway.call_sizes(), vec![4, 2, 1, 1, 1, 1, 1]);
    assert!(outcome.resolved.is_empty());
    assert_eq!(outcome.failed, missing);
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn test_single_fallback_shouldNotLetOneFailureBlockOthers() {
    let f = fixture(
        MockGateway::batches_always_fail().with_failing_language("french"),
        roomy_token_config(),
    );
    let missing = languages(&["german", "french", "spanish"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    // One failed language never blocks the rest
    assert_eq!(outcome.resolved, languages(&["german", "spanish"]));
    assert_eq!(outcome.failed, languages(&["french"]));
    assert!(f.cache.get_language("Hello", "german").is_some());
    assert!(f.cache.get_language("Hello", "french").is_none());
    assert!(f.cache.get_language("Hello", "spanish").is_some());

    // Every language ended up attempted through the single tier
    let single_languages: std::collections::HashSet<String> = f
        .gateway
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.len() == 1)
        .flat_map(|c| c.iter().cloned())
        .collect();
    for language in &missing {
        assert!(single_languages.contains(language));
    }
}

#[tokio::test]
async fn test_translate_entry_withTransientFailure_shouldRecoverWithinAttempts() {
    let f = fixture(MockGateway::failing_first(2), roomy_token_config());
    let missing = languages(&["german", "french"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.resolved.len(), 2);
    // Two failures, then the halved batch succeeds, then the remainder
    assert_eq!(f.gateway.call_sizes(), vec![2, 1, 1, 1]);
}

#[tokio::test]
async fn test_translate_entry_withOversizedText_shouldGoStraightToSingleCalls() {
    let f = fixture(MockGateway::new(), micro_token_config());
    let missing = languages(&["german", "french"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    // Nothing fits in a batch, so every call is a single-language one
    assert_eq!(f.gateway.call_sizes(), vec![1, 1]);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_planned_batches_shouldNeverExceedTokenBudget() {
    let f = fixture(MockGateway::new(), tight_token_config());
    let estimator = TokenEstimator::new(&tight_token_config());
    let budget = estimator.max_allowed_tokens();
    let text = "Hello";
    let missing = languages(&["german", "french", "japanese", "koreana", "polish"]);

    f.scheduler.translate_entry(text, &missing).await;

    for call in f.gateway.calls.lock().unwrap().iter() {
        let estimate = estimator.estimate_prompt(text, call)
            + call
                .iter()
                .map(|language| estimator.estimate_response(text, language))
                .sum::<u32>();
        assert!(
            estimate <= budget,
            "call for [{}] estimated at {} tokens, budget {}",
            call.join(", "),
            estimate,
            budget
        );
    }
}

#[tokio::test]
async fn test_translate_entry_withCancellation_shouldNotStartNewBatches() {
    let f = fixture(MockGateway::new(), roomy_token_config());
    f.cancel.store(true, Ordering::Relaxed);

    let outcome = f
        .scheduler
        .translate_entry("Hello", &languages(&["german", "french"]))
        .await;

    assert_eq!(f.gateway.call_count(), 0);
    assert!(outcome.resolved.is_empty());
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_translate_entry_withPartialBatchResponse_shouldReplanRemainder() {
    // french never succeeds, so batch responses cover only german/spanish
    let f = fixture(
        MockGateway::new().with_failing_language("french"),
        roomy_token_config(),
    );
    let missing = languages(&["german", "french", "spanish"]);

    let outcome = f.scheduler.translate_entry("Hello", &missing).await;

    assert!(outcome.resolved.contains(&"german".to_string()));
    assert!(outcome.resolved.contains(&"spanish".to_string()));
    assert_eq!(outcome.failed, languages(&["french"]));
    assert!(f.cache.get_language("Hello", "french").is_none());
}
