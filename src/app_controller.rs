use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app_config::Config;
use crate::file_utils::{FileManager, find_localization_files};
use crate::localization::{LocalizationFile, LocalizationWriter, translated_output_path};
use crate::providers::ProviderKind;
use crate::providers::gateway::{ProviderGateway, TranslationGateway};
use crate::statistics::{Counter, Statistics};
use crate::translation::{BatchScheduler, EntryProcessor, TokenEstimator, TranslationCache};

// @module: Application controller for localization translation

/// Main application controller wiring the engine together
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Statistics collaborator
    stats: Arc<Statistics>,

    // @field: Durable translation cache
    cache: Arc<TranslationCache>,

    // @field: Per-entry processor shared by all workers
    processor: Arc<EntryProcessor>,

    // @field: Cooperative cancellation flag
    cancel: Arc<AtomicBool>,
}

impl Controller {
    /// Build the engine: load the cache, validate providers, wire the
    /// scheduler. Fails if the cache directory cannot be created or no
    /// provider passes validation - the two startup catastrophes worth
    /// aborting for.
    pub async fn new(config: Config, cancel: Arc<AtomicBool>) -> Result<Self> {
        let stats = Arc::new(Statistics::new());

        let cache = Arc::new(
            TranslationCache::load(config.cache_path(), stats.clone())
                .context("Failed to open durable cache store for writing")?,
        );

        debug!("[CACHE] Using store at {}", cache.path().display());

        let mut gateway = ProviderGateway::new(&config, stats.clone());
        gateway
            .validate()
            .await
            .context("No translation provider validated at startup")?;
        debug!(
            "[RATE_LIMIT] Remaining calls - Anthropic: {}, OpenAI: {}",
            gateway.remaining_calls(ProviderKind::Anthropic),
            gateway.remaining_calls(ProviderKind::OpenAi)
        );
        let gateway: Arc<dyn TranslationGateway> = Arc::new(gateway);

        let estimator = TokenEstimator::new(&config.tokens);
        let scheduler = BatchScheduler::new(
            gateway,
            cache.clone(),
            estimator,
            cancel.clone(),
            config.batch.batch_attempts,
        );
        let processor = Arc::new(EntryProcessor::new(cache.clone(), scheduler, stats.clone()));

        Ok(Self {
            config,
            stats,
            cache,
            processor,
            cancel,
        })
    }

    /// Translate every localization file under `input`.
    ///
    /// Files are distributed over a bounded pool of workers, one file per
    /// worker; within a file, entries are processed sequentially. Per-file
    /// failures are reported and do not abort the run.
    pub async fn run(&self, input: &Path, force_overwrite: bool) -> Result<()> {
        if !FileManager::file_exists(input) && !FileManager::dir_exists(input) {
            return Err(anyhow!("Input path does not exist: {}", input.display()));
        }

        let files = find_localization_files(input);
        if files.is_empty() {
            return Err(anyhow!(
                "No localization files found under {}",
                input.display()
            ));
        }

        info!(
            "Processing {} localization files with up to {} workers",
            files.len(),
            self.config.max_workers
        );

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let results: Vec<(std::path::PathBuf, Result<()>)> = stream::iter(files)
            .map(|file| {
                let progress = progress.clone();
                async move {
                    let result = if self.cancel.load(Ordering::Relaxed) {
                        Ok(())
                    } else {
                        self.process_file(&file, force_overwrite).await
                    };
                    progress.inc(1);
                    (file, result)
                }
            })
            .buffer_unordered(self.config.max_workers)
            .collect()
            .await;

        progress.finish_and_clear();

        // Flush whatever state exists before reporting anything
        if let Err(e) = self.cache.flush() {
            warn!("[CACHE] Final flush failed: {}", e);
        }

        for (file, result) in &results {
            if let Err(e) = result {
                warn!("Failed to process {}: {:#}", file.display(), e);
            }
        }

        if self.cancel.load(Ordering::Relaxed) {
            info!("Run interrupted; completed translations were preserved in the cache");
        }
        self.stats.log_summary();
        Ok(())
    }

    /// Process one localization file end to end
    async fn process_file(&self, path: &Path, force_overwrite: bool) -> Result<()> {
        let output = translated_output_path(path);
        if output.exists() && !force_overwrite {
            info!(
                "Skipping {} - output exists (use --force-overwrite to redo)",
                path.display()
            );
            return Ok(());
        }

        let file = LocalizationFile::open(path)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let languages = file.target_languages();
        if languages.is_empty() {
            warn!("{} has no target language columns, skipping", path.display());
            return Ok(());
        }

        debug!(
            "[FILES] {}: {} entries, {} target languages",
            path.display(),
            file.entries.len(),
            languages.len()
        );

        let mut writer = LocalizationWriter::new(&file);
        for entry in &file.entries {
            if self.cancel.load(Ordering::Relaxed) {
                debug!("[FILES] Cancellation requested, stopping {}", path.display());
                break;
            }
            let text = file.source_text(entry);
            self.processor
                .process(&entry.key, text, &languages, &mut writer)
                .await;
        }

        writer
            .save(&output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        self.stats.increment(Counter::FilesProcessed, 1);
        info!("Wrote {}", output.display());
        Ok(())
    }
}
