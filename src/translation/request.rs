/*!
 * Translation work items.
 */

use serde::{Deserialize, Serialize};

/// A single string to translate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Source text in the base language
    pub source_text: String,
    /// Target language code
    pub target_lang: String,
    /// Source language code
    pub source_lang: String,
    /// UI category the string belongs to
    pub category: String,
    /// Optional usage context passed to the model
    pub context: Option<String>,
}

impl TranslationRequest {
    /// Create a request with default source language and category
    pub fn new(source_text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            target_lang: target_lang.into(),
            source_lang: "en".to_string(),
            category: "general".to_string(),
            context: None,
        }
    }

    /// Set the source language
    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the usage context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Language pair key used to group requests into homogeneous chunks
    pub fn language_pair(&self) -> (String, String) {
        (self.source_lang.clone(), self.target_lang.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_shouldUseDefaults() {
        let request = TranslationRequest::new("Save", "pt");

        assert_eq!(request.source_lang, "en");
        assert_eq!(request.category, "general");
        assert!(request.context.is_none());
    }

    #[test]
    fn test_builders_shouldOverrideDefaults() {
        let request = TranslationRequest::new("Save", "pt")
            .with_source_lang("fr")
            .with_category("buttons")
            .with_context("Toolbar action");

        assert_eq!(request.source_lang, "fr");
        assert_eq!(request.category, "buttons");
        assert_eq!(request.context.as_deref(), Some("Toolbar action"));
    }
}
