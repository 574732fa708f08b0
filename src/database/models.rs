/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Review status for stored translations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting human review
    Pending,
    /// Reviewed and usable in the application
    Approved,
    /// Reviewed and rejected
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid approval status: {}", s)),
        }
    }
}

/// Stored translation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Unique identifier (UUID)
    pub id: String,
    /// Source text in the base language
    pub source_text: String,
    /// Target language code
    pub target_lang: String,
    /// Source language code
    pub source_lang: String,
    /// Translated text
    pub translated_text: String,
    /// Model that produced the translation
    pub model: String,
    /// UI category the string belongs to
    pub category: String,
    /// Optional usage context passed to the model
    pub context: Option<String>,
    /// Whether the translation was machine-generated
    pub is_auto_translated: bool,
    /// Review status
    pub status: ApprovalStatus,
    /// Quality score assigned to the translation (0-100)
    pub quality_score: Option<i64>,
    /// Number of times the record was reused from the store
    pub usage_count: i64,
    /// Record version, incremented on re-translation
    pub version: i64,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl TranslationRecord {
    /// Create a new machine-generated translation record
    pub fn new_auto(
        source_text: String,
        target_lang: String,
        source_lang: String,
        translated_text: String,
        model: String,
        category: String,
        context: Option<String>,
        quality_score: i64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_text,
            target_lang,
            source_lang,
            translated_text,
            model,
            category,
            context,
            is_auto_translated: true,
            status: ApprovalStatus::Approved,
            quality_score: Some(quality_score),
            usage_count: 1,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Per-language translation coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageStats {
    /// Target language code
    pub target_lang: String,
    /// Number of stored translations for the language
    pub translated: i64,
    /// Number of approved translations for the language
    pub approved: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approvalStatus_displayAndParse_shouldRoundTrip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            let parsed: ApprovalStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_approvalStatus_withInvalidValue_shouldFail() {
        let result: Result<ApprovalStatus, _> = "unknown".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_newAuto_shouldMarkRecordApproved() {
        let record = TranslationRecord::new_auto(
            "Save".to_string(),
            "pt".to_string(),
            "en".to_string(),
            "Guardar".to_string(),
            "test-model".to_string(),
            "general".to_string(),
            None,
            95,
        );

        assert_eq!(record.status, ApprovalStatus::Approved);
        assert!(record.is_auto_translated);
        assert_eq!(record.quality_score, Some(95));
        assert_eq!(record.usage_count, 1);
        assert_eq!(record.version, 1);
        assert!(!record.id.is_empty());
    }
}
