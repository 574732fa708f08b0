use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO 639-1)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO 639-1)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Rate limiting config for the free API tier
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Path to the SQLite translation database; defaults to the user data dir
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Log file path; progress and errors go to the console and this file
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Model identifier sent to the API and recorded on cache rows
    #[serde(default = "default_model")]
    pub model: String,

    /// Service endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Temperature for generation; low for consistent translations
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per request
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Number of requests sent to the API in one numbered-list prompt
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Category label recorded on rows produced by this run
    #[serde(default = "default_category")]
    pub category: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            category: default_category(),
        }
    }
}

/// Rate limiting configuration for the API free tier
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per credential in any trailing 60-second window
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Maximum requests per credential per calendar day
    #[serde(default = "default_requests_per_day")]
    pub requests_per_day: u32,

    /// Minimum spacing between consecutive requests, in seconds
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_between_requests_secs: u64,

    /// Backoff multiplier applied to the retry delay after each failure
    #[serde(default = "default_retry_delay_multiplier")]
    pub retry_delay_multiplier: f64,

    /// Base retry delay in milliseconds before the multiplier applies
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum retry attempts per chunk before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            requests_per_day: default_requests_per_day(),
            min_delay_between_requests_secs: default_min_delay_secs(),
            retry_delay_multiplier: default_retry_delay_multiplier(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "pt".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    8000
}

fn default_batch_size() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_category() -> String {
    "general".to_string()
}

fn default_requests_per_minute() -> u32 {
    // Free tier: 2 requests per minute per key
    2
}

fn default_requests_per_day() -> u32 {
    // Free tier: 250 requests per day per key
    250
}

fn default_min_delay_secs() -> u64 {
    30
}

fn default_retry_delay_multiplier() -> f64 {
    2.0
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.translation.model.is_empty() {
            return Err(anyhow!("Translation model must not be empty"));
        }

        if self.translation.batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        if self.rate_limit.requests_per_minute == 0 {
            return Err(anyhow!("requests_per_minute must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            database_path: None,
            log_file: default_log_file(),
            log_level: LogLevel::default(),
        }
    }
}

fn default_log_file() -> String {
    "translation.log".to_string()
}
