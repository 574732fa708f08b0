/*!
 * Response parsing for batch translation.
 *
 * Responses are numbered lists and are paired to sources by position.
 * A count mismatch means the pairing cannot be trusted for any line,
 * so the whole chunk is rejected instead of partially applied.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TranslationError;

/// Matches a leading list number like "1. " or "12) "
static NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)]\s*").expect("Invalid number prefix regex"));

/// Parse a numbered-list translation response into positional translations
///
/// Lines carrying a list number are preferred; if the model dropped the
/// numbering entirely, all non-empty lines are taken instead. The result
/// must contain exactly `expected` translations.
pub fn parse_translation_response(
    response: &str,
    expected: usize,
) -> Result<Vec<String>, TranslationError> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let numbered: Vec<String> = lines
        .iter()
        .filter(|line| NUMBER_PREFIX.is_match(line))
        .map(|line| NUMBER_PREFIX.replace(line, "").trim().to_string())
        .collect();

    let translations = if numbered.is_empty() {
        lines.iter().map(|line| line.to_string()).collect()
    } else {
        numbered
    };

    if translations.len() != expected {
        return Err(TranslationError::ResponseCountMismatch {
            expected,
            got: translations.len(),
        });
    }

    Ok(translations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parseTranslationResponse_withNumberedLines_shouldStripNumbers() {
        let response = "1. Guardar\n2. Cancelar";

        let translations = parse_translation_response(response, 2).unwrap();

        assert_eq!(translations, vec!["Guardar", "Cancelar"]);
    }

    #[test]
    fn test_parseTranslationResponse_withParenthesisNumbering_shouldStripNumbers() {
        let response = "1) Enregistrer\n2) Annuler\n3) Fermer";

        let translations = parse_translation_response(response, 3).unwrap();

        assert_eq!(translations, vec!["Enregistrer", "Annuler", "Fermer"]);
    }

    #[test]
    fn test_parseTranslationResponse_withBlankLines_shouldIgnoreThem() {
        let response = "\n1. Guardar\n\n2. Cancelar\n\n";

        let translations = parse_translation_response(response, 2).unwrap();

        assert_eq!(translations, vec!["Guardar", "Cancelar"]);
    }

    #[test]
    fn test_parseTranslationResponse_withPreamble_shouldKeepOnlyNumberedLines() {
        let response = "Here are the translations:\n1. Guardar\n2. Cancelar";

        let translations = parse_translation_response(response, 2).unwrap();

        assert_eq!(translations, vec!["Guardar", "Cancelar"]);
    }

    #[test]
    fn test_parseTranslationResponse_withMissingLine_shouldFail() {
        let response = "1. Guardar";

        let result = parse_translation_response(response, 2);

        assert!(matches!(
            result,
            Err(TranslationError::ResponseCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_parseTranslationResponse_withExtraLines_shouldFail() {
        let response = "1. Guardar\n2. Cancelar\n3. Fechar";

        let result = parse_translation_response(response, 2);

        assert!(result.is_err());
    }

    #[test]
    fn test_parseTranslationResponse_withoutNumbering_shouldFallBackToLines() {
        let response = "Guardar\nCancelar";

        let translations = parse_translation_response(response, 2).unwrap();

        assert_eq!(translations, vec!["Guardar", "Cancelar"]);
    }
}
