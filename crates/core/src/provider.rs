//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider performs one structured-generation call. The caller may
//! constrain the model to a single named function, in which case the
//! answer is expected to be a [`GenerateResponse::ToolCall`]. Without a
//! constraint the model answers in free text.
//!
//! Implementations: OpenAI-compatible endpoints (Gemini, OpenAI, OpenRouter, Ollama).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// A function definition sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The function name
    pub name: String,

    /// Description of what the function does
    pub description: String,

    /// JSON Schema describing the function's parameters
    pub parameters: serde_json::Value,
}

/// How strictly the model is steered towards the constraint's function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    /// The model must invoke the function.
    #[default]
    Any,
    /// The model may invoke the function or answer in text.
    Auto,
}

/// A single function schema the model is directed to invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub function: ToolDefinition,
    #[serde(default)]
    pub mode: CallMode,
}

impl Constraint {
    /// Force the model to call `function`.
    pub fn forced(function: ToolDefinition) -> Self {
        Self {
            function,
            mode: CallMode::Any,
        }
    }
}

/// Configuration for a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "gemini-2.5-flash", "gpt-4o")
    pub model: String,

    /// The full rendered prompt
    pub prompt: String,

    /// Function the model is steered to invoke; `None` for free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,

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

impl GenerateRequest {
    /// A request that forces the model to call `function`.
    pub fn constrained(
        model: impl Into<String>,
        prompt: impl Into<String>,
        function: ToolDefinition,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            constraint: Some(Constraint::forced(function)),
            temperature,
            max_tokens: None,
        }
    }

    /// A plain free-text request.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            constraint: None,
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The result of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerateResponse {
    /// Free-text answer.
    Text { content: String },

    /// A single function invocation with decoded JSON arguments.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
}

impl GenerateResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments,
        }
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls
/// `generate()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Run one generation call.
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<GenerateResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
