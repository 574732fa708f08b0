use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::error;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use crate::rate_limit::KeyRing;

use super::{GenerationOutcome, TextGenerator};

/// Gemini client for interacting with the generative-language API
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// Ordered credential list; rotation takes effect on the next request
    keys: Mutex<KeyRing>,
    /// API endpoint base URL
    endpoint: String,
    /// Model identifier in the request path
    model: String,
    /// Temperature for generation
    temperature: f32,
    /// Maximum number of tokens to generate
    max_output_tokens: u32,
}

/// Gemini generateContent request
#[derive(Debug, Serialize)]
struct GeminiRequest {
    /// The conversation contents
    contents: Vec<GeminiContent>,
    /// Generation parameters
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// A single content block in a request or response
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    /// The text parts of this content block
    parts: Vec<GeminiPart>,
}

/// A text part within a content block
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    /// The actual text
    text: String,
}

/// Generation parameters
#[derive(Debug, Serialize)]
struct GenerationConfig {
    /// Temperature for generation
    temperature: f32,
    /// Maximum number of tokens to generate
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    /// Number of candidates to generate
    #[serde(rename = "candidateCount")]
    candidate_count: u32,
}

/// Gemini generateContent response
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    /// Token usage information
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

/// A single generated candidate
#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    /// The candidate content
    content: Option<GeminiContent>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct UsageMetadata {
    /// Number of prompt tokens
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    /// Number of generated tokens
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

/// Error payload returned by the API
#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: Option<GeminiErrorDetail>,
}

/// Detail section of an API error payload
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        keys: KeyRing,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_output_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        // Validate the endpoint up front so a typo fails at construction
        Url::parse(&endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid API endpoint '{}': {}", endpoint, e))?;

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            keys: Mutex::new(keys),
            endpoint,
            model: model.into(),
            temperature,
            max_output_tokens,
        })
    }

    /// Build the request URL for the active credential
    fn request_url(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        )
    }

    /// Map an API error response to a typed provider error.
    ///
    /// 429 and RESOURCE_EXHAUSTED are the quota signals; 401/403 indicate a
    /// bad or revoked key. Anything else surfaces as an ApiError whose text
    /// is still subject to the last-resort keyword check in
    /// `ProviderError::is_rate_limited`.
    fn classify_error(status: StatusCode, body: &str) -> ProviderError {
        let detail: Option<GeminiErrorDetail> = serde_json::from_str::<GeminiErrorBody>(body)
            .ok()
            .and_then(|b| b.error);
        let message = detail
            .as_ref()
            .filter(|d| !d.message.is_empty())
            .map(|d| d.message.clone())
            .unwrap_or_else(|| body.to_string());
        let api_status = detail.map(|d| d.status).unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
            return ProviderError::RateLimitExceeded(message);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ProviderError::AuthenticationError(message);
        }

        ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str) -> Result<GenerationOutcome, ProviderError> {
        let api_key = self.keys.lock().current().to_string();
        let url = self.request_url(&api_key);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                candidate_count: 1,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(Self::classify_error(status, &error_text));
        }

        let parsed = response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let text: String = parsed
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let (prompt_tokens, completion_tokens) = parsed
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((None, None));

        Ok(GenerationOutcome {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }

    fn key_fingerprint(&self) -> String {
        self.keys.lock().fingerprint()
    }

    fn rotate_key(&self) -> bool {
        self.keys.lock().rotate()
    }

    fn key_count(&self) -> usize {
        self.keys.lock().len()
    }

    fn rotations(&self) -> u64 {
        self.keys.lock().rotations()
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}
