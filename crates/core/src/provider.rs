//! Completion client trait — the abstraction over hosted LLM backends.
//!
//! A completion client takes a prompt (wrapped in a [`CompletionRequest`])
//! and returns generated text. Everything behind the trait is opaque to the
//! interaction loop: auth, quota, and network failures all come back as a
//! [`CompletionError`].
//!
//! Implementations: native Gemini, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::message::Message;

/// Configuration for a single completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gemini-2.0-flash", "gpt-4o-mini")
    pub model: String,

    /// The messages: an optional system instruction, then the user prompt
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    /// Build a request for a single prompt, optionally preceded by a system instruction.
    pub fn for_prompt(
        model: impl Into<String>,
        prompt: impl Into<String>,
        system: Option<&str>,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The user prompt, i.e. the content of the last user message.
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A complete response from a completion client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core completion trait.
///
/// The interaction loop calls `complete()` without knowing which backend is
/// being used.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// A human-readable name for this client (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a request and get the complete generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;

    /// List available models for this backend.
    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the backend with our credentials?
    async fn health_check(&self) -> Result<bool, CompletionError> {
        Ok(true)
    }
}
