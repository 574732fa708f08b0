/*!
 * Provider implementations for the remote text-generation service.
 *
 * This module contains the client used to call the generative-language API
 * and the trait seam that lets the batch translator run against a mock in
 * tests.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

/// Outcome of one generation request
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The generated text
    pub text: String,
    /// Number of prompt tokens, when the API reports usage
    pub prompt_tokens: Option<u64>,
    /// Number of generated tokens, when the API reports usage
    pub completion_tokens: Option<u64>,
}

/// Common trait for text-generation clients
///
/// The batch translator talks to the remote service exclusively through
/// this trait, which also exposes the credential rotation hooks it needs
/// for quota handling.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the generated text
    async fn generate(&self, prompt: &str) -> Result<GenerationOutcome, ProviderError>;

    /// Fingerprint of the active credential, for quota bookkeeping
    fn key_fingerprint(&self) -> String;

    /// Switch to the next configured credential; false when only one exists
    fn rotate_key(&self) -> bool;

    /// Number of credentials configured
    fn key_count(&self) -> usize;

    /// Rotations performed during this run
    fn rotations(&self) -> u64;

    /// Model identifier recorded on produced translations
    fn model_id(&self) -> String;
}

pub mod gemini;
pub mod mock;
