/*!
 * Mock generator implementations for testing.
 *
 * This module provides mock generators that simulate different behaviors:
 * - `MockGenerator::echo()` - Translates every numbered prompt line by prefixing it
 * - `MockGenerator::scripted(..)` - Returns queued responses/errors in order
 * - `MockGenerator::failing(..)` - Always fails with the given error builder
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{GenerationOutcome, TextGenerator};

/// One scripted reply, either a response body or an error
pub type ScriptedReply = Result<String, ProviderError>;

/// Behavior mode for the mock generator
enum MockBehavior {
    /// Parse the numbered list out of the prompt and echo each line with a prefix
    Echo {
        /// Prefix prepended to every echoed line
        prefix: String,
    },
    /// Pop queued replies in order; errors once the queue is empty
    Scripted {
        /// Remaining replies
        replies: Mutex<VecDeque<ScriptedReply>>,
    },
    /// Always fail with the same error text
    Failing {
        /// Error message returned on every call
        message: String,
    },
}

/// Mock generator for testing batch translation behavior
pub struct MockGenerator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of simulated credentials
    key_count: usize,
    /// Index of the active simulated credential
    current_key: AtomicUsize,
    /// Rotations performed
    rotations: AtomicU64,
    /// Number of generate calls made
    calls: AtomicUsize,
}

impl MockGenerator {
    /// Create a mock that echoes every numbered prompt line with a prefix
    pub fn echo(prefix: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Echo {
            prefix: prefix.into(),
        })
    }

    /// Create a mock that returns the given replies in order
    pub fn scripted(replies: Vec<ScriptedReply>) -> Self {
        Self::with_behavior(MockBehavior::Scripted {
            replies: Mutex::new(replies.into_iter().collect()),
        })
    }

    /// Create a mock that always fails with the same error text
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Failing {
            message: message.into(),
        })
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            key_count: 1,
            current_key: AtomicUsize::new(0),
            rotations: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulate the given number of configured credentials
    pub fn with_keys(mut self, key_count: usize) -> Self {
        self.key_count = key_count.max(1);
        self
    }

    /// Number of generate calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Extract the texts of a numbered-list prompt
    fn numbered_texts(prompt: &str) -> Vec<String> {
        prompt
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                let (num, rest) = trimmed.split_once(". ")?;
                if num.chars().all(|c| c.is_ascii_digit()) && !num.is_empty() {
                    Some(rest.to_string())
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = match &self.behavior {
            MockBehavior::Echo { prefix } => {
                let texts = Self::numbered_texts(prompt);
                if texts.is_empty() {
                    return Err(ProviderError::EmptyResponse);
                }
                texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| format!("{}. {}{}", i + 1, prefix, t))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            MockBehavior::Scripted { replies } => {
                let reply = replies.lock().pop_front().unwrap_or_else(|| {
                    Err(ProviderError::RequestFailed(
                        "Mock reply queue exhausted".to_string(),
                    ))
                });
                reply?
            }
            MockBehavior::Failing { message } => {
                return Err(ProviderError::RequestFailed(message.clone()));
            }
        };

        Ok(GenerationOutcome {
            text,
            prompt_tokens: Some(10),
            completion_tokens: Some(10),
        })
    }

    fn key_fingerprint(&self) -> String {
        format!("mock-key-{}", self.current_key.load(Ordering::SeqCst) + 1)
    }

    fn rotate_key(&self) -> bool {
        if self.key_count <= 1 {
            return false;
        }
        let next = (self.current_key.load(Ordering::SeqCst) + 1) % self.key_count;
        self.current_key.store(next, Ordering::SeqCst);
        self.rotations.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn key_count(&self) -> usize {
        self.key_count
    }

    fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::SeqCst)
    }

    fn model_id(&self) -> String {
        "mock-model".to_string()
    }
}
