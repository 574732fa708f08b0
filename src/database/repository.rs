/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all translation store
 * operations, abstracting away the SQL details and providing
 * type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, OptionalExtension, Row};

use super::connection::DatabaseConnection;
use super::models::{ApprovalStatus, LanguageStats, TranslationRecord};

/// Repository for translation store operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

/// Parse a translation row in column order
fn parse_translation_row(row: &Row) -> rusqlite::Result<TranslationRecord> {
    Ok(TranslationRecord {
        id: row.get(0)?,
        source_text: row.get(1)?,
        target_lang: row.get(2)?,
        source_lang: row.get(3)?,
        translated_text: row.get(4)?,
        model: row.get(5)?,
        category: row.get(6)?,
        context: row.get(7)?,
        is_auto_translated: row.get::<_, i64>(8)? != 0,
        status: row
            .get::<_, String>(9)?
            .parse()
            .unwrap_or(ApprovalStatus::Pending),
        quality_score: row.get(10)?,
        usage_count: row.get(11)?,
        version: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Shared column list for translation queries
const TRANSLATION_COLUMNS: &str = "id, source_text, target_lang, source_lang, translated_text, \
     model, category, context, is_auto_translated, status, \
     quality_score, usage_count, version, created_at, updated_at";

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Get the underlying database connection
    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Look up an approved translation for the exact source text and target language
    ///
    /// Ties on quality score resolve to the most recently updated record.
    pub async fn find_approved(
        &self,
        source_text: &str,
        target_lang: &str,
    ) -> Result<Option<TranslationRecord>> {
        let source_text = source_text.to_string();
        let target_lang = target_lang.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!(
                            "SELECT {TRANSLATION_COLUMNS} FROM translations
                             WHERE source_text = ?1 AND target_lang = ?2 AND status = 'approved'
                             ORDER BY quality_score DESC, updated_at DESC
                             LIMIT 1"
                        ),
                        params![source_text, target_lang],
                        parse_translation_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Insert a translation, or refresh the existing record for the same
    /// source text and target language
    ///
    /// On conflict the translated text and timestamp are replaced and the
    /// usage count is incremented, so repeated runs never duplicate rows.
    pub async fn upsert_translation(&self, record: &TranslationRecord) -> Result<()> {
        let record = record.clone();

        debug!(
            "Upserting translation for '{}' -> {}",
            record.source_text, record.target_lang
        );

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (
                        id, source_text, target_lang, source_lang, translated_text,
                        model, category, context, is_auto_translated, status,
                        quality_score, usage_count, version, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                    ON CONFLICT(source_text, target_lang) DO UPDATE SET
                        translated_text = excluded.translated_text,
                        model = excluded.model,
                        updated_at = excluded.updated_at,
                        usage_count = translations.usage_count + 1
                    "#,
                    params![
                        record.id,
                        record.source_text,
                        record.target_lang,
                        record.source_lang,
                        record.translated_text,
                        record.model,
                        record.category,
                        record.context,
                        record.is_auto_translated as i64,
                        record.status.to_string(),
                        record.quality_score,
                        record.usage_count,
                        record.version,
                        record.created_at,
                        record.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Find source texts that exist in the base language but have no
    /// record in the target language, shortest first
    pub async fn find_untranslated(
        &self,
        base_lang: &str,
        target_lang: &str,
        limit: Option<u32>,
    ) -> Result<Vec<String>> {
        let base_lang = base_lang.to_string();
        let target_lang = target_lang.to_string();

        self.db
            .execute_async(move |conn| {
                let mut sql = String::from(
                    "SELECT DISTINCT source_text FROM translations
                     WHERE target_lang = ?1
                       AND source_text NOT IN (
                           SELECT source_text FROM translations WHERE target_lang = ?2
                       )
                     ORDER BY LENGTH(source_text) ASC",
                );
                if let Some(limit) = limit {
                    sql.push_str(&format!(" LIMIT {}", limit));
                }

                let mut stmt = conn.prepare(&sql)?;
                let texts = stmt
                    .query_map(params![base_lang, target_lang], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;

                Ok(texts)
            })
            .await
    }

    /// Get a translation by source text and target language regardless of status
    pub async fn get_translation(
        &self,
        source_text: &str,
        target_lang: &str,
    ) -> Result<Option<TranslationRecord>> {
        let source_text = source_text.to_string();
        let target_lang = target_lang.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!(
                            "SELECT {TRANSLATION_COLUMNS} FROM translations
                             WHERE source_text = ?1 AND target_lang = ?2"
                        ),
                        params![source_text, target_lang],
                        parse_translation_row,
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Count stored translations for a target language
    pub async fn count_for_language(&self, target_lang: &str) -> Result<i64> {
        let target_lang = target_lang.to_string();

        self.db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM translations WHERE target_lang = ?1",
                    params![target_lang],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
    }

    /// Per-language translation coverage, ordered by language code
    pub async fn language_stats(&self) -> Result<Vec<LanguageStats>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT target_lang,
                            COUNT(*),
                            SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END)
                     FROM translations
                     GROUP BY target_lang
                     ORDER BY target_lang",
                )?;

                let stats = stmt
                    .query_map([], |row| {
                        Ok(LanguageStats {
                            target_lang: row.get(0)?,
                            translated: row.get(1)?,
                            approved: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(stats)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(source: &str, target: &str, translated: &str) -> TranslationRecord {
        TranslationRecord::new_auto(
            source.to_string(),
            target.to_string(),
            "en".to_string(),
            translated.to_string(),
            "test-model".to_string(),
            "general".to_string(),
            None,
            95,
        )
    }

    #[tokio::test]
    async fn test_findApproved_withStoredRecord_shouldReturnIt() {
        let repo = Repository::new_in_memory().unwrap();
        repo.upsert_translation(&test_record("Save", "pt", "Guardar"))
            .await
            .unwrap();

        let found = repo.find_approved("Save", "pt").await.unwrap();

        let found = found.expect("Expected a stored translation");
        assert_eq!(found.translated_text, "Guardar");
        assert_eq!(found.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn test_findApproved_withDifferentLanguage_shouldReturnNone() {
        let repo = Repository::new_in_memory().unwrap();
        repo.upsert_translation(&test_record("Save", "pt", "Guardar"))
            .await
            .unwrap();

        let found = repo.find_approved("Save", "es").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_upsertTranslation_twiceForSamePair_shouldKeepOneRow() {
        let repo = Repository::new_in_memory().unwrap();

        repo.upsert_translation(&test_record("Save", "pt", "Salvar"))
            .await
            .unwrap();
        repo.upsert_translation(&test_record("Save", "pt", "Guardar"))
            .await
            .unwrap();

        let count = repo.count_for_language("pt").await.unwrap();
        assert_eq!(count, 1);

        let found = repo.get_translation("Save", "pt").await.unwrap().unwrap();
        assert_eq!(found.translated_text, "Guardar");
        // A fresh record starts at one use; the re-translation adds one
        assert_eq!(found.usage_count, 2);
    }

    #[tokio::test]
    async fn test_findUntranslated_shouldReturnBacklogShortestFirst() {
        let repo = Repository::new_in_memory().unwrap();

        // Base corpus under 'en' as identity records
        for text in ["A considerably longer label", "Save", "Cancel"] {
            repo.upsert_translation(&test_record(text, "en", text))
                .await
                .unwrap();
        }
        // One already translated
        repo.upsert_translation(&test_record("Cancel", "pt", "Cancelar"))
            .await
            .unwrap();

        let backlog = repo.find_untranslated("en", "pt", None).await.unwrap();

        assert_eq!(backlog, vec!["Save", "A considerably longer label"]);
    }

    #[tokio::test]
    async fn test_findUntranslated_withLimit_shouldTruncate() {
        let repo = Repository::new_in_memory().unwrap();

        for text in ["One", "Three", "Seventeen"] {
            repo.upsert_translation(&test_record(text, "en", text))
                .await
                .unwrap();
        }

        let backlog = repo.find_untranslated("en", "pt", Some(2)).await.unwrap();
        assert_eq!(backlog.len(), 2);
        assert_eq!(backlog[0], "One");
    }

    #[tokio::test]
    async fn test_languageStats_shouldGroupByTargetLanguage() {
        let repo = Repository::new_in_memory().unwrap();

        repo.upsert_translation(&test_record("Save", "pt", "Guardar"))
            .await
            .unwrap();
        repo.upsert_translation(&test_record("Cancel", "pt", "Cancelar"))
            .await
            .unwrap();
        repo.upsert_translation(&test_record("Save", "es", "Guardar"))
            .await
            .unwrap();

        let stats = repo.language_stats().await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].target_lang, "es");
        assert_eq!(stats[0].translated, 1);
        assert_eq!(stats[1].target_lang, "pt");
        assert_eq!(stats[1].translated, 2);
        assert_eq!(stats[1].approved, 2);
    }
}
