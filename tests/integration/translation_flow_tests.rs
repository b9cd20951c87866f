/*!
 * End-to-end tests of the engine: localization file in, scheduler and
 * cache in the middle, translated file out. The provider gateway is
 * mocked; everything else is the real thing.
 */

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tempfile::TempDir;

use loctrans::app_config::TokenConfig;
use loctrans::localization::{LocalizationFile, LocalizationWriter, translated_output_path};
use loctrans::statistics::{Counter, Statistics};
use loctrans::translation::{
    BatchScheduler, EntryProcessor, TokenEstimator, TranslationCache,
};

use crate::common::{MockGateway, init_test_logging};

const SAMPLE: &str = "\
Key,File,Type,UsedInMainMenu,NoTranslate,english,Context / Alternate Text,german,french
greeting,UI,Label,,,Hello,,,
farewell,UI,Label,,,Goodbye,,,
";

struct Engine {
    processor: EntryProcessor,
    gateway: Arc<MockGateway>,
    cache: Arc<TranslationCache>,
    stats: Arc<Statistics>,
}

fn engine(dir: &TempDir, gateway: MockGateway) -> Engine {
    init_test_logging();
    let stats = Arc::new(Statistics::new());
    let cache = Arc::new(
        TranslationCache::load(dir.path().join("cache.json"), stats.clone()).unwrap(),
    );
    let gateway = Arc::new(gateway);
    let scheduler = BatchScheduler::new(
        gateway.clone(),
        cache.clone(),
        TokenEstimator::new(&TokenConfig {
            max_tokens: 100_000,
            margin: 0.65,
        }),
        Arc::new(AtomicBool::new(false)),
        3,
    );
    let processor = EntryProcessor::new(cache.clone(), scheduler, stats.clone());
    Engine {
        processor,
        gateway,
        cache,
        stats,
    }
}

async fn process_file(engine: &Engine, input: &std::path::Path) -> std::path::PathBuf {
    let file = LocalizationFile::open(input).unwrap();
    let target_languages = file.target_languages();
    let mut writer = LocalizationWriter::new(&file);

    for entry in &file.entries {
        let text = file.source_text(entry);
        engine
            .processor
            .process(&entry.key, text, &target_languages, &mut writer)
            .await;
    }

    let output = translated_output_path(input);
    writer.save(&output).unwrap();
    output
}

#[tokio::test]
async fn test_flow_withHealthyGateway_shouldFillEveryLanguageColumn() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Localization.txt");
    std::fs::write(&input, SAMPLE).unwrap();

    let engine = engine(&dir, MockGateway::new());
    let output = process_file(&engine, &input).await;

    let translated = LocalizationFile::open(&output).unwrap();
    let german = translated.column_index("german").unwrap();
    let french = translated.column_index("french").unwrap();
    assert_eq!(translated.entries[0].fields[german], "german:Hello");
    assert_eq!(translated.entries[0].fields[french], "french:Hello");
    assert_eq!(translated.entries[1].fields[german], "german:Goodbye");

    // One batch call per entry was enough
    assert_eq!(engine.gateway.call_sizes(), vec![2, 2]);
    assert_eq!(engine.stats.get(Counter::EntriesTranslated), 2);
    assert_eq!(engine.stats.get(Counter::TotalTranslations), 4);
}

#[tokio::test]
async fn test_flow_runTwice_shouldServeSecondRunFromCache() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Localization.txt");
    std::fs::write(&input, SAMPLE).unwrap();

    let engine = engine(&dir, MockGateway::new());
    process_file(&engine, &input).await;
    let calls_after_first = engine.gateway.call_count();

    let output = process_file(&engine, &input).await;
    assert_eq!(engine.gateway.call_count(), calls_after_first);

    // Output is still complete, fed purely from the cache
    let translated = LocalizationFile::open(&output).unwrap();
    let german = translated.column_index("german").unwrap();
    assert_eq!(translated.entries[0].fields[german], "german:Hello");
}

#[tokio::test]
async fn test_flow_withFailingLanguage_shouldWritePartialOutput() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Localization.txt");
    std::fs::write(&input, SAMPLE).unwrap();

    let engine = engine(
        &dir,
        MockGateway::new().with_failing_language("french"),
    );
    let output = process_file(&engine, &input).await;

    // Partial output is preferable to none: german lands, french stays empty
    let translated = LocalizationFile::open(&output).unwrap();
    let german = translated.column_index("german").unwrap();
    let french = translated.column_index("french").unwrap();
    assert_eq!(translated.entries[0].fields[german], "german:Hello");
    assert_eq!(translated.entries[0].fields[french], "");
    assert!(engine.cache.get_language("Hello", "french").is_none());
}

#[tokio::test]
async fn test_flow_shouldSurviveProcessRestart() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Localization.txt");
    std::fs::write(&input, SAMPLE).unwrap();

    {
        let engine = engine(&dir, MockGateway::new());
        process_file(&engine, &input).await;
    }

    // A fresh engine over the same cache file needs no API calls at all
    let engine = engine(&dir, MockGateway::new());
    process_file(&engine, &input).await;
    assert_eq!(engine.gateway.call_count(), 0);
}
