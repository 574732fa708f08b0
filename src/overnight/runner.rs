/*!
 * The overnight batch loop.
 *
 * The runner drains the translation backlog for each requested target
 * language in fixed-size batches, pacing itself between batches and
 * languages, checkpointing progress so an interrupted run can resume,
 * and producing a final report when the backlog is empty.
 */

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::overnight::checkpoint::{ProgressCheckpoint, CHECKPOINT_FILENAME};
use crate::overnight::stats::RunStats;
use crate::translation::{BatchTranslator, TranslationRequest};

/// Checkpoint after this many batches
const CHECKPOINT_INTERVAL: usize = 5;

/// Report filename written next to the checkpoint
const REPORT_FILENAME: &str = "overnight_report.txt";

/// Free tier allowance per credential, requests per minute
const FREE_TIER_REQUESTS_PER_MINUTE: f64 = 2.0;

/// Options for an overnight run
#[derive(Debug, Clone)]
pub struct OvernightOptions {
    /// Target languages to process, in order
    pub languages: Vec<String>,
    /// Strings per batch
    pub batch_size: usize,
    /// Cap on backlog strings per language
    pub max_translations: Option<u32>,
    /// Estimate the run without making any model calls or writes
    pub dry_run: bool,
    /// Where to persist resumable progress
    pub checkpoint_path: PathBuf,
    /// Pause between target languages
    pub language_pause: Duration,
    /// Pause after a batch that fell back to source text
    pub failure_pause: Duration,
}

impl Default for OvernightOptions {
    fn default() -> Self {
        Self {
            languages: vec!["pt".to_string()],
            batch_size: 15,
            max_translations: None,
            dry_run: false,
            checkpoint_path: PathBuf::from(CHECKPOINT_FILENAME),
            language_pause: Duration::from_secs(30),
            failure_pause: Duration::from_secs(60),
        }
    }
}

/// Unattended batch translation runner
pub struct OvernightRunner {
    /// Batch translation pipeline
    translator: BatchTranslator,
    /// Application configuration
    config: Config,
    /// Set to request a clean stop at the next batch boundary
    interrupted: Arc<AtomicBool>,
}

impl OvernightRunner {
    /// Create a new runner
    pub fn new(translator: BatchTranslator, config: Config) -> Self {
        Self {
            translator,
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the interrupt flag checked at batch boundaries
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// Spawn a task that trips the interrupt flag on Ctrl-C
    pub fn install_interrupt_handler(&self) {
        let flag = self.interrupt_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing current batch before stopping");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    /// Run overnight translation for the configured languages
    ///
    /// An existing checkpoint replaces backlog extraction entirely, so a
    /// resumed run continues with exactly the strings the previous run
    /// had left, even for languages not on the current request. On clean
    /// completion the checkpoint is deleted and a report is written next
    /// to it.
    pub async fn run(&self, options: &OvernightOptions) -> Result<RunStats> {
        let (mut remaining, mut stats, mut completed, mut failed_texts) =
            match ProgressCheckpoint::load(&options.checkpoint_path)? {
                Some(checkpoint) => {
                    info!("Resuming from checkpoint saved at {}", checkpoint.timestamp);
                    (
                        checkpoint.remaining,
                        checkpoint.stats,
                        checkpoint.completed,
                        checkpoint.failed,
                    )
                }
                None => {
                    let remaining = self.collect_backlog(options).await?;
                    let mut stats = RunStats::new();
                    stats.total_requested = remaining.values().map(Vec::len).sum();
                    (remaining, stats, HashMap::new(), Vec::new())
                }
            };

        if options.dry_run {
            return Ok(self.dry_run_report(&remaining, stats));
        }

        // Process every language the backlog holds. A checkpoint may carry
        // languages beyond the requested list; dropping them here would
        // destroy their saved backlog when the checkpoint is removed.
        let mut languages: Vec<String> = options
            .languages
            .iter()
            .filter(|lang| remaining.contains_key(*lang))
            .cloned()
            .collect();
        let mut carried: Vec<String> = remaining
            .keys()
            .filter(|lang| !languages.contains(*lang))
            .cloned()
            .collect();
        carried.sort();
        languages.extend(carried);

        for (lang_index, lang) in languages.iter().enumerate() {
            let backlog = remaining.get(lang).cloned().unwrap_or_default();
            if backlog.is_empty() {
                remaining.remove(lang);
                stats.languages_processed.push(lang.clone());
                continue;
            }

            info!("Processing {}: {} strings to translate", lang, backlog.len());
            let progress = language_progress_bar(lang, backlog.len() as u64);

            let mut batches_done = 0usize;
            let mut index = 0usize;

            while index < backlog.len() {
                if self.interrupted.load(Ordering::SeqCst) {
                    remaining.insert(lang.clone(), backlog[index..].to_vec());
                    self.save_checkpoint(options, &completed, &failed_texts, &remaining, &stats)?;
                    progress.abandon_with_message("interrupted");
                    info!("Stopped cleanly, progress saved for resume");
                    return Ok(stats);
                }

                let end = (index + options.batch_size.max(1)).min(backlog.len());
                let batch: Vec<TranslationRequest> = backlog[index..end]
                    .iter()
                    .map(|text| {
                        TranslationRequest::new(text.clone(), lang.clone())
                            .with_source_lang(self.config.source_language.clone())
                            .with_category(self.config.translation.category.clone())
                    })
                    .collect();

                let outcome = self.translator.translate_batch(&batch).await?;

                stats.already_cached += outcome.cache_hits;
                stats.newly_translated += outcome.newly_translated();
                stats.failed_translations += outcome.failed.len();
                stats.api_calls_made += outcome.api_calls;
                let batch_failed = !outcome.failed.is_empty();
                failed_texts.extend(outcome.failed);
                *completed.entry(lang.clone()).or_default() += end - index;

                progress.inc((end - index) as u64);
                index = end;
                batches_done += 1;
                remaining.insert(lang.clone(), backlog[index..].to_vec());

                if batches_done % CHECKPOINT_INTERVAL == 0 {
                    self.save_checkpoint(options, &completed, &failed_texts, &remaining, &stats)?;
                }

                if batch_failed && index < backlog.len() {
                    warn!(
                        "Batch had failures, pausing {}s before continuing",
                        options.failure_pause.as_secs()
                    );
                    tokio::time::sleep(options.failure_pause).await;
                }
            }

            progress.finish_with_message("done");
            remaining.remove(lang);
            stats.languages_processed.push(lang.clone());

            if lang_index + 1 < languages.len() {
                info!(
                    "Finished {}, pausing {}s before next language",
                    lang,
                    options.language_pause.as_secs()
                );
                tokio::time::sleep(options.language_pause).await;
            }
        }

        stats.keys_rotated = self.translator.generator().rotations();
        stats.finish();

        let report = stats.report();
        for line in report.lines() {
            info!("{}", line);
        }

        let report_path = options.checkpoint_path.with_file_name(REPORT_FILENAME);
        if let Err(e) = std::fs::write(&report_path, &report) {
            warn!("Could not write report to {:?}: {}", report_path, e);
        }

        ProgressCheckpoint::remove(&options.checkpoint_path)?;
        Ok(stats)
    }

    /// Query the store for untranslated strings per target language
    async fn collect_backlog(
        &self,
        options: &OvernightOptions,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut backlog = HashMap::new();

        for lang in &options.languages {
            let texts = self
                .translator
                .repository()
                .find_untranslated(&self.config.source_language, lang, options.max_translations)
                .await?;
            info!("{}: {} untranslated strings", lang, texts.len());
            backlog.insert(lang.clone(), texts);
        }

        Ok(backlog)
    }

    /// Log backlog sizes and a time estimate without touching the store
    fn dry_run_report(
        &self,
        remaining: &HashMap<String, Vec<String>>,
        stats: RunStats,
    ) -> RunStats {
        let total: usize = remaining.values().map(Vec::len).sum();
        let keys = self.translator.generator().key_count().max(1);

        info!("Dry run: {} strings across {} languages", total, remaining.len());
        for (lang, texts) in remaining {
            info!("  {}: {} strings", lang, texts.len());
        }

        let requests_per_hour = keys as f64 * FREE_TIER_REQUESTS_PER_MINUTE * 60.0;
        let batches = total.div_ceil(self.config.translation.batch_size.max(1));
        let hours = batches as f64 / requests_per_hour;
        info!(
            "Estimated time with {} credential(s): {:.1} hours",
            keys, hours
        );

        stats
    }

    /// Persist the current progress
    fn save_checkpoint(
        &self,
        options: &OvernightOptions,
        completed: &HashMap<String, usize>,
        failed: &[String],
        remaining: &HashMap<String, Vec<String>>,
        stats: &RunStats,
    ) -> Result<()> {
        let checkpoint = ProgressCheckpoint::new(
            completed.clone(),
            failed.to_vec(),
            remaining.clone(),
            stats.clone(),
        );
        checkpoint.save(&options.checkpoint_path)
    }
}

/// Progress bar for one language's backlog
fn language_progress_bar(lang: &str, total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} strings ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(lang.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Repository, TranslationRecord};
    use crate::providers::mock::MockGenerator;
    use tempfile::tempdir;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.rate_limit.min_delay_between_requests_secs = 0;
        config.rate_limit.requests_per_minute = 1000;
        config.rate_limit.requests_per_day = 100_000;
        config.rate_limit.retry_base_delay_ms = 1;
        config
    }

    fn fast_options(dir: &std::path::Path) -> OvernightOptions {
        OvernightOptions {
            languages: vec!["pt".to_string()],
            batch_size: 2,
            max_translations: None,
            dry_run: false,
            checkpoint_path: dir.join(CHECKPOINT_FILENAME),
            language_pause: Duration::ZERO,
            failure_pause: Duration::ZERO,
        }
    }

    async fn seed_base_corpus(repo: &Repository, texts: &[&str]) {
        for text in texts {
            let record = TranslationRecord::new_auto(
                text.to_string(),
                "en".to_string(),
                "en".to_string(),
                text.to_string(),
                "seed".to_string(),
                "general".to_string(),
                None,
                100,
            );
            repo.upsert_translation(&record).await.unwrap();
        }
    }

    fn runner_with(generator: Arc<MockGenerator>, repo: Repository) -> OvernightRunner {
        let config = fast_config();
        let translator = BatchTranslator::new(generator, repo, config.clone());
        OvernightRunner::new(translator, config)
    }

    #[tokio::test]
    async fn test_run_shouldDrainBacklogAndRemoveCheckpoint() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel", "Close"]).await;

        let runner = runner_with(Arc::new(MockGenerator::echo("pt:")), repo.clone());
        let stats = runner.run(&fast_options(dir.path())).await.unwrap();

        assert_eq!(stats.total_requested, 3);
        assert_eq!(stats.newly_translated, 3);
        assert_eq!(stats.failed_translations, 0);
        assert_eq!(stats.languages_processed, vec!["pt"]);
        assert!(stats.finished_at.is_some());

        assert_eq!(repo.count_for_language("pt").await.unwrap(), 3);
        assert!(!dir.path().join(CHECKPOINT_FILENAME).exists());
        assert!(dir.path().join(REPORT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_run_withDryRun_shouldMakeNoCallsOrWrites() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel"]).await;

        let generator = Arc::new(MockGenerator::echo("pt:"));
        let runner = runner_with(Arc::clone(&generator), repo.clone());

        let mut options = fast_options(dir.path());
        options.dry_run = true;
        let stats = runner.run(&options).await.unwrap();

        assert_eq!(stats.total_requested, 2);
        assert_eq!(stats.api_calls_made, 0);
        assert_eq!(generator.call_count(), 0);
        assert_eq!(repo.count_for_language("pt").await.unwrap(), 0);
        assert!(!dir.path().join(CHECKPOINT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_run_withInterruptSet_shouldSaveCheckpointAndStop() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel"]).await;

        let runner = runner_with(Arc::new(MockGenerator::echo("pt:")), repo.clone());
        runner.interrupt_flag().store(true, Ordering::SeqCst);

        let stats = runner.run(&fast_options(dir.path())).await.unwrap();

        assert_eq!(stats.newly_translated, 0);
        assert!(stats.finished_at.is_none());

        let checkpoint = ProgressCheckpoint::load(dir.path().join(CHECKPOINT_FILENAME))
            .unwrap()
            .expect("Expected a saved checkpoint");
        assert_eq!(checkpoint.remaining_count(), 2);
    }

    #[tokio::test]
    async fn test_run_withCheckpoint_shouldResumeRemainingStringsOnly() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel"]).await;

        // A previous run already finished "Save"
        let mut remaining = HashMap::new();
        remaining.insert("pt".to_string(), vec!["Cancel".to_string()]);
        let mut completed = HashMap::new();
        completed.insert("pt".to_string(), 1usize);
        let mut stats = RunStats::new();
        stats.total_requested = 2;
        stats.newly_translated = 1;
        ProgressCheckpoint::new(completed, Vec::new(), remaining, stats)
            .save(dir.path().join(CHECKPOINT_FILENAME))
            .unwrap();

        let runner = runner_with(Arc::new(MockGenerator::echo("pt:")), repo.clone());
        let stats = runner.run(&fast_options(dir.path())).await.unwrap();

        // Only the remaining string is translated, counters carry over
        assert_eq!(stats.total_requested, 2);
        assert_eq!(stats.newly_translated, 2);
        assert_eq!(repo.count_for_language("pt").await.unwrap(), 1);
        assert!(repo.find_approved("Cancel", "pt").await.unwrap().is_some());
        assert!(repo.find_approved("Save", "pt").await.unwrap().is_none());
        assert!(!dir.path().join(CHECKPOINT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_run_withCheckpoint_shouldProcessLanguagesBeyondRequestedList() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel"]).await;

        // The interrupted run was working through pt and es; the resume
        // only asks for pt
        let mut remaining = HashMap::new();
        remaining.insert("pt".to_string(), vec!["Save".to_string()]);
        remaining.insert("es".to_string(), vec!["Cancel".to_string()]);
        let mut stats = RunStats::new();
        stats.total_requested = 2;
        ProgressCheckpoint::new(HashMap::new(), Vec::new(), remaining, stats)
            .save(dir.path().join(CHECKPOINT_FILENAME))
            .unwrap();

        let runner = runner_with(Arc::new(MockGenerator::echo("t:")), repo.clone());
        let stats = runner.run(&fast_options(dir.path())).await.unwrap();

        // The saved es backlog is drained, not lost with the checkpoint
        assert_eq!(stats.newly_translated, 2);
        assert!(repo.find_approved("Save", "pt").await.unwrap().is_some());
        assert!(repo.find_approved("Cancel", "es").await.unwrap().is_some());
        assert_eq!(stats.languages_processed, vec!["pt", "es"]);
        assert!(!dir.path().join(CHECKPOINT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_run_withFailingGenerator_shouldRecordFailuresAndComplete() {
        let dir = tempdir().unwrap();
        let repo = Repository::new_in_memory().unwrap();
        seed_base_corpus(&repo, &["Save", "Cancel"]).await;

        let runner = runner_with(Arc::new(MockGenerator::failing("down")), repo.clone());
        let stats = runner.run(&fast_options(dir.path())).await.unwrap();

        assert_eq!(stats.failed_translations, 2);
        assert_eq!(stats.newly_translated, 0);
        assert_eq!(repo.count_for_language("pt").await.unwrap(), 0);
        assert!(!dir.path().join(CHECKPOINT_FILENAME).exists());
    }
}
