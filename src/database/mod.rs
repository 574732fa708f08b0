/*!
 * Translation store built on SQLite.
 *
 * This module provides persistent storage for translations:
 * - `connection`: Thread-safe SQLite access with async helpers
 * - `schema`: Table definitions and versioned migrations
 * - `models`: Typed records mapping to database rows
 * - `repository`: High-level query API used by the translation pipeline
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{ApprovalStatus, LanguageStats, TranslationRecord};
pub use repository::Repository;
