use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Language utilities for ISO language code handling
///
/// This module resolves ISO 639-1 language codes to the dialect-aware
/// display names embedded in translation prompts. Web UI strings for
/// Portuguese must target the European variant, so a small override table
/// takes precedence over the generic ISO name.
static DIALECT_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("pt", "European Portuguese (Portugal)");
    m.insert("es", "Spanish");
    m.insert("fr", "French");
    m.insert("de", "German");
    m.insert("it", "Italian");
    m.insert("en", "English");
    m
});

/// Validate that a code is a known ISO 639-1 (2-letter) language code
pub fn validate_language_code(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 && Language::from_639_1(&normalized).is_some() {
        return Ok(normalized);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the dialect-aware display name for a language code
///
/// Falls back to the ISO English name for codes without a dialect override,
/// and finally to the raw code for anything isolang does not know.
pub fn dialect_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();

    if let Some(name) = DIALECT_NAMES.get(normalized.as_str()) {
        return (*name).to_string();
    }

    Language::from_639_1(&normalized)
        .map(|lang| lang.to_name().to_string())
        .unwrap_or(normalized)
}

/// Check if two language codes refer to the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    code1.trim().to_lowercase() == code2.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateLanguageCode_withValidCode_shouldNormalize() {
        assert_eq!(validate_language_code(" PT ").unwrap(), "pt");
        assert_eq!(validate_language_code("en").unwrap(), "en");
    }

    #[test]
    fn test_validateLanguageCode_withInvalidCode_shouldFail() {
        assert!(validate_language_code("xx").is_err());
        assert!(validate_language_code("portuguese").is_err());
    }

    #[test]
    fn test_dialectName_withPortuguese_shouldUseEuropeanVariant() {
        assert_eq!(dialect_name("pt"), "European Portuguese (Portugal)");
    }

    #[test]
    fn test_dialectName_withUnmappedCode_shouldFallBackToIsoName() {
        assert_eq!(dialect_name("nl"), "Dutch");
    }

    #[test]
    fn test_dialectName_withUnknownCode_shouldReturnRawCode() {
        assert_eq!(dialect_name("zz"), "zz");
    }

    #[test]
    fn test_languageCodesMatch_shouldIgnoreCaseAndWhitespace() {
        assert!(language_codes_match("PT", " pt"));
        assert!(!language_codes_match("pt", "es"));
    }
}
