/*!
 * Error types for the lingobatch application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when working with the remote generation API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or quota exhaustion
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The API returned an empty or text-free response
    #[error("Empty response from API")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether this error signals quota or rate-limit exhaustion.
    ///
    /// Typed variants are checked first. Keyword matching on the error text
    /// is kept only as a last resort for errors the client could not
    /// classify from the HTTP status or API error payload.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ProviderError::RateLimitExceeded(_) => true,
            ProviderError::ApiError { message, .. }
            | ProviderError::RequestFailed(message) => {
                let lower = message.to_lowercase();
                lower.contains("quota") || lower.contains("limit")
            }
            _ => false,
        }
    }
}

/// Errors that can occur when loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No usable API key was found in the environment
    #[error("No API key configured: set GEMINI_API_KEY (and optionally GEMINI_API_KEY_2..4)")]
    MissingApiKey,

    /// The configuration file could not be read or parsed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during batch translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response line count does not match the number of requested texts
    #[error("Response contains {got} lines for {expected} requested texts")]
    ResponseCountMismatch {
        /// Number of texts sent in the prompt
        expected: usize,
        /// Number of translation lines parsed from the response
        got: usize,
    },

    /// All retry attempts for a chunk were exhausted
    #[error("Chunk failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts performed
        attempts: u32,
        /// The final error message
        last_error: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isRateLimited_withTypedVariant_shouldReturnTrue() {
        let err = ProviderError::RateLimitExceeded("429".to_string());
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_isRateLimited_withQuotaKeyword_shouldFallBackToTextMatch() {
        let err = ProviderError::ApiError {
            status_code: 400,
            message: "Quota exceeded for metric".to_string(),
        };
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_isRateLimited_withUnrelatedError_shouldReturnFalse() {
        let err = ProviderError::ConnectionError("connection refused".to_string());
        assert!(!err.is_rate_limited());
    }
}
