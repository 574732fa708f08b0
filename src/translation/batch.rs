/*!
 * Cache-aware batch translation.
 *
 * The batch translator orchestrates the full pipeline for a set of
 * requests: store lookups first, then chunked model calls under quota
 * control, with key rotation on quota errors and exponential backoff
 * on other failures. Every requested string always receives a result;
 * chunks that exhaust their retries fall back to the source text.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::database::{Repository, TranslationRecord};
use crate::errors::TranslationError;
use crate::providers::TextGenerator;
use crate::rate_limit::QuotaTracker;
use crate::translation::parsing::parse_translation_response;
use crate::translation::prompt::build_translation_prompt;
use crate::translation::request::TranslationRequest;

/// Quality score recorded for machine translations
const AUTO_TRANSLATION_QUALITY: i64 = 95;

/// Result of translating a batch of requests
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Source text to translated text, covering every requested string
    pub translations: HashMap<String, String>,
    /// Number of strings answered from the store
    pub cache_hits: usize,
    /// Number of model calls made
    pub api_calls: usize,
    /// Source texts that fell back to their original text
    pub failed: Vec<String>,
}

impl BatchOutcome {
    /// Number of strings answered by the model
    pub fn newly_translated(&self) -> usize {
        self.translations
            .len()
            .saturating_sub(self.cache_hits + self.failed.len())
    }
}

/// Batch translation orchestrator
pub struct BatchTranslator {
    /// Text generation backend
    generator: Arc<dyn TextGenerator>,
    /// Translation store
    repository: Repository,
    /// Per-credential quota tracking
    quota: Mutex<QuotaTracker>,
    /// Application configuration
    config: Config,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(generator: Arc<dyn TextGenerator>, repository: Repository, config: Config) -> Self {
        let quota = Mutex::new(QuotaTracker::new(config.rate_limit.clone()));
        Self {
            generator,
            repository,
            quota,
            config,
        }
    }

    /// Get the underlying translation store
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Get the text generation backend
    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Translate a batch of requests
    ///
    /// The outcome maps every requested source text to a translation.
    /// Strings already approved in the store are returned without a
    /// model call. Remaining strings are grouped by language pair and
    /// translated in chunks of the configured batch size.
    pub async fn translate_batch(
        &self,
        requests: &[TranslationRequest],
    ) -> anyhow::Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        // Group by language pair so every chunk shares one prompt header
        let mut groups: Vec<((String, String), Vec<TranslationRequest>)> = Vec::new();
        for request in requests {
            let pair = request.language_pair();
            match groups.iter_mut().find(|(key, _)| *key == pair) {
                Some((_, group)) => group.push(request.clone()),
                None => groups.push((pair, vec![request.clone()])),
            }
        }

        for ((source_lang, target_lang), group) in groups {
            let mut pending: Vec<TranslationRequest> = Vec::new();

            for request in group {
                match self
                    .repository
                    .find_approved(&request.source_text, &target_lang)
                    .await?
                {
                    Some(record) => {
                        debug!("Cache hit for '{}' -> {}", request.source_text, target_lang);
                        outcome
                            .translations
                            .insert(request.source_text, record.translated_text);
                        outcome.cache_hits += 1;
                    }
                    None => pending.push(request),
                }
            }

            if pending.is_empty() {
                continue;
            }

            info!(
                "Translating {} strings {} -> {}",
                pending.len(),
                source_lang,
                target_lang
            );

            for chunk in pending.chunks(self.config.translation.batch_size.max(1)) {
                self.translate_chunk(chunk, &source_lang, &target_lang, &mut outcome)
                    .await?;
            }
        }

        Ok(outcome)
    }

    /// Translate a single string
    pub async fn translate_single(&self, request: TranslationRequest) -> anyhow::Result<String> {
        let source_text = request.source_text.clone();
        let outcome = self.translate_batch(std::slice::from_ref(&request)).await?;

        outcome
            .translations
            .get(&source_text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No translation produced for '{}'", source_text))
    }

    /// Translate one chunk, storing results and applying the fallback on failure
    async fn translate_chunk(
        &self,
        chunk: &[TranslationRequest],
        source_lang: &str,
        target_lang: &str,
        outcome: &mut BatchOutcome,
    ) -> anyhow::Result<()> {
        let texts: Vec<String> = chunk.iter().map(|r| r.source_text.clone()).collect();
        let context = chunk.iter().find_map(|r| r.context.clone());
        let category = chunk
            .first()
            .map(|r| r.category.clone())
            .unwrap_or_else(|| self.config.translation.category.clone());

        let prompt =
            build_translation_prompt(&texts, source_lang, target_lang, &category, context.as_deref());

        match self.generate_with_retries(&prompt, texts.len(), outcome).await {
            Ok(translations) => {
                for (request, translated) in chunk.iter().zip(translations) {
                    let record = TranslationRecord::new_auto(
                        request.source_text.clone(),
                        target_lang.to_string(),
                        source_lang.to_string(),
                        translated.clone(),
                        self.generator.model_id(),
                        request.category.clone(),
                        request.context.clone(),
                        AUTO_TRANSLATION_QUALITY,
                    );
                    self.repository.upsert_translation(&record).await?;
                    outcome
                        .translations
                        .insert(request.source_text.clone(), translated);
                }
            }
            Err(e) => {
                warn!(
                    "Chunk of {} strings failed, keeping source text: {}",
                    chunk.len(),
                    e
                );
                for request in chunk {
                    outcome
                        .translations
                        .insert(request.source_text.clone(), request.source_text.clone());
                    outcome.failed.push(request.source_text.clone());
                }
            }
        }

        Ok(())
    }

    /// Call the model with quota waits, key rotation and exponential backoff
    async fn generate_with_retries(
        &self,
        prompt: &str,
        expected: usize,
        outcome: &mut BatchOutcome,
    ) -> Result<Vec<String>, TranslationError> {
        let max_retries = self.config.rate_limit.max_retries;
        let mut attempt: u32 = 0;
        let mut last_error = String::new();
        // A quota error may be specific to the active credential, so each
        // attempt may try every remaining credential before it counts as failed
        let mut rotations_left = self.generator.key_count().saturating_sub(1);

        while attempt < max_retries {
            self.wait_for_quota().await;
            outcome.api_calls += 1;

            match self.generator.generate(prompt).await {
                Ok(generation) => {
                    // Only completed requests count against the key's budget
                    self.quota.lock().record(&self.generator.key_fingerprint());
                    match parse_translation_response(&generation.text, expected) {
                        Ok(translations) => return Ok(translations),
                        Err(e) => {
                            warn!("Unusable response (attempt {}/{}): {}", attempt + 1, max_retries, e);
                            last_error = e.to_string();
                            attempt += 1;
                            self.backoff(attempt).await;
                        }
                    }
                }
                Err(e) if e.is_rate_limited() && rotations_left > 0 => {
                    if self.generator.rotate_key() {
                        rotations_left -= 1;
                        warn!(
                            "Quota exhausted, rotated to credential {}",
                            self.generator.key_fingerprint()
                        );
                        continue;
                    }
                    last_error = e.to_string();
                    attempt += 1;
                    self.backoff(attempt).await;
                }
                Err(e) => {
                    warn!(
                        "Model call failed (attempt {}/{}): {}",
                        attempt + 1,
                        max_retries,
                        e
                    );
                    last_error = e.to_string();
                    attempt += 1;
                    self.backoff(attempt).await;
                }
            }
        }

        Err(TranslationError::RetriesExhausted {
            attempts: max_retries,
            last_error,
        })
    }

    /// Block until the active credential may make another request
    async fn wait_for_quota(&self) {
        let key_id = self.generator.key_fingerprint();

        // Compute the wait outside the lock so other tasks are not blocked
        let wait = self.quota.lock().wait_duration(&key_id);
        if wait > Duration::ZERO {
            info!(
                "Rate limit: waiting {:.0}s before next request",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Sleep for the exponential backoff delay of the given attempt
    async fn backoff(&self, attempt: u32) {
        let base = self.config.rate_limit.retry_base_delay_ms as f64;
        let multiplier = self.config.rate_limit.retry_delay_multiplier;
        let delay_ms = base * multiplier.powi(attempt.saturating_sub(1) as i32);

        debug!("Backing off for {:.0}ms", delay_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::Config;
    use crate::errors::ProviderError;
    use crate::providers::mock::MockGenerator;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.rate_limit.min_delay_between_requests_secs = 0;
        config.rate_limit.requests_per_minute = 1000;
        config.rate_limit.requests_per_day = 100_000;
        config.rate_limit.retry_base_delay_ms = 1;
        config
    }

    fn translator(generator: MockGenerator) -> BatchTranslator {
        BatchTranslator::new(
            Arc::new(generator),
            Repository::new_in_memory().unwrap(),
            fast_config(),
        )
    }

    fn requests(texts: &[&str]) -> Vec<TranslationRequest> {
        texts
            .iter()
            .map(|t| TranslationRequest::new(*t, "pt"))
            .collect()
    }

    #[tokio::test]
    async fn test_translateBatch_shouldTranslateAndStoreAllStrings() {
        let translator = translator(MockGenerator::echo("pt:"));

        let outcome = translator
            .translate_batch(&requests(&["Save", "Cancel"]))
            .await
            .unwrap();

        assert_eq!(outcome.translations.len(), 2);
        assert_eq!(outcome.translations["Save"], "pt:Save");
        assert_eq!(outcome.cache_hits, 0);
        assert!(outcome.failed.is_empty());

        // Results must be persisted as approved records
        let stored = translator
            .repository
            .find_approved("Cancel", "pt")
            .await
            .unwrap();
        assert_eq!(stored.unwrap().translated_text, "pt:Cancel");
    }

    #[tokio::test]
    async fn test_translateBatch_withStoredTranslation_shouldSkipModelCall() {
        let translator = translator(MockGenerator::echo("pt:"));
        let record = TranslationRecord::new_auto(
            "Save".to_string(),
            "pt".to_string(),
            "en".to_string(),
            "Guardar".to_string(),
            "m".to_string(),
            "general".to_string(),
            None,
            95,
        );
        translator.repository.upsert_translation(&record).await.unwrap();

        let outcome = translator
            .translate_batch(&requests(&["Save"]))
            .await
            .unwrap();

        assert_eq!(outcome.translations["Save"], "Guardar");
        assert_eq!(outcome.cache_hits, 1);
        assert_eq!(outcome.api_calls, 0);
    }

    #[tokio::test]
    async fn test_translateBatch_withFailingGenerator_shouldFallBackToSourceText() {
        let translator = translator(MockGenerator::failing("boom"));

        let outcome = translator
            .translate_batch(&requests(&["Save", "Cancel"]))
            .await
            .unwrap();

        // Totality: every input still receives a result
        assert_eq!(outcome.translations.len(), 2);
        assert_eq!(outcome.translations["Save"], "Save");
        assert_eq!(outcome.failed.len(), 2);

        // Fallbacks are never persisted
        let stored = translator
            .repository
            .get_translation("Save", "pt")
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_translateBatch_withQuotaError_shouldRotateAndRetry() {
        let generator = MockGenerator::scripted(vec![
            Err(ProviderError::RateLimitExceeded("quota exceeded".to_string())),
            Ok("1. Guardar".to_string()),
        ])
        .with_keys(2);
        let translator = translator(generator);

        let outcome = translator
            .translate_batch(&requests(&["Save"]))
            .await
            .unwrap();

        assert_eq!(outcome.translations["Save"], "Guardar");
        assert!(outcome.failed.is_empty());
        assert_eq!(translator.generator.rotations(), 1);
        // Rotation retries immediately without consuming an attempt
        assert_eq!(outcome.api_calls, 2);
    }

    #[tokio::test]
    async fn test_translateBatch_withCountMismatch_shouldRetryThenFallBack() {
        // Always returns one line for a two-string chunk
        let generator = MockGenerator::scripted(vec![
            Ok("1. Guardar".to_string()),
            Ok("1. Guardar".to_string()),
            Ok("1. Guardar".to_string()),
        ]);
        let translator = translator(generator);

        let outcome = translator
            .translate_batch(&requests(&["Save", "Cancel"]))
            .await
            .unwrap();

        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.api_calls, 3);
        assert_eq!(outcome.translations["Save"], "Save");
    }

    #[tokio::test]
    async fn test_translateBatch_withFailedCalls_shouldNotConsumeDailyQuota() {
        let translator = translator(MockGenerator::failing("down"));

        translator
            .translate_batch(&requests(&["Save"]))
            .await
            .unwrap();

        // Attempts that never completed must not count against the key
        assert_eq!(translator.quota.lock().requests_today("mock-key-1"), 0);
    }

    #[tokio::test]
    async fn test_translateBatch_withCompletedCall_shouldRecordQuota() {
        let translator = translator(MockGenerator::echo("pt:"));

        translator
            .translate_batch(&requests(&["Save"]))
            .await
            .unwrap();

        assert_eq!(translator.quota.lock().requests_today("mock-key-1"), 1);
    }

    #[tokio::test]
    async fn test_translateSingle_shouldReturnTranslation() {
        let translator = translator(MockGenerator::echo("x"));

        let translated = translator
            .translate_single(TranslationRequest::new("Save", "pt"))
            .await
            .unwrap();

        assert_eq!(translated, "xSave");
    }

    #[tokio::test]
    async fn test_translateBatch_withMixedLanguages_shouldGroupByPair() {
        let translator = translator(MockGenerator::echo("t:"));
        let mut reqs = requests(&["Save"]);
        reqs.push(TranslationRequest::new("Save", "es"));

        let outcome = translator.translate_batch(&reqs).await.unwrap();

        // One chunk per language pair
        assert_eq!(outcome.api_calls, 2);
        let pt = translator.repository.find_approved("Save", "pt").await.unwrap();
        let es = translator.repository.find_approved("Save", "es").await.unwrap();
        assert!(pt.is_some());
        assert!(es.is_some());
    }
}
