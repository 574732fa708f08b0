/*!
 * # LingoBatch - Rate-limited batch translation for web app i18n
 *
 * A Rust library for translating web application UI strings in bulk
 * with the Gemini API free tier, without ever tripping its quotas.
 *
 * ## Features
 *
 * - Per-credential quota tracking (per-minute, per-day, minimum spacing)
 * - Automatic rotation across multiple API keys on quota errors
 * - SQLite-backed translation store that doubles as a cache
 * - Numbered-list batch prompts with positional response parsing
 * - Dialect-aware prompts (e.g. European Portuguese, never Brazilian)
 * - Unattended overnight runs with resumable checkpoints
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `rate_limit`: Quota tracking and API key rotation
 * - `providers`: Client implementations for text generation backends:
 *   - `providers::gemini`: Gemini API client
 *   - `providers::mock`: Scriptable generator for tests
 * - `translation`: The batch translation pipeline:
 *   - `translation::prompt`: Numbered-list prompt construction
 *   - `translation::parsing`: Positional response parsing
 *   - `translation::batch`: Cache-aware orchestration with retries
 * - `database`: SQLite translation store
 * - `overnight`: Unattended bulk runs with checkpoints and reports
 * - `language_utils`: ISO language code and dialect name utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod overnight;
pub mod providers;
pub mod rate_limit;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{Repository, TranslationRecord};
pub use errors::{AppError, ConfigError, ProviderError, TranslationError};
pub use language_utils::{dialect_name, language_codes_match, validate_language_code};
pub use overnight::{OvernightOptions, OvernightRunner, RunStats};
pub use rate_limit::{KeyRing, QuotaTracker};
pub use translation::{BatchOutcome, BatchTranslator, TranslationRequest};
