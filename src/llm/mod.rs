//! Completion model abstraction and the OpenAI-compatible client.

pub mod errors;
pub mod openai;
#[cfg(test)]
pub(crate) mod scripted;

pub use errors::{LlmError, LlmResult};
pub use openai::OpenAiClient;

use std::future::Future;
use std::pin::Pin;

use futures::Stream;

/// Boxed future type for completion operations.
pub type LlmFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stream of text deltas from a streamed completion.
pub type TextStream = Pin<Box<dyn Stream<Item = LlmResult<String>> + Send>>;

/// Speaker of a prompt message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptRole {
    /// System instructions.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
}

impl PromptRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message sent to the model.
#[derive(Clone, Debug)]
pub struct PromptMessage {
    /// Who is speaking.
    pub role: PromptRole,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// Build a message.
    #[must_use]
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Ordered conversation, system prompt first.
    pub messages: Vec<PromptMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Build a JSON-mode request from a system and a user prompt.
    #[must_use]
    pub fn json(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            messages: vec![
                PromptMessage::new(PromptRole::System, system),
                PromptMessage::new(PromptRole::User, user),
            ],
            temperature,
            json_mode: true,
        }
    }

    /// Text of the system prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == PromptRole::System)
            .map(|m| m.content.as_str())
    }
}

/// Completion model used by the content generator.
pub trait CompletionModel: Send + Sync {
    /// Run a completion and return the raw model output.
    ///
    /// # Errors
    /// Returns an error if the provider call fails.
    fn complete(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<String>>;

    /// Run a streamed completion and return its text deltas.
    ///
    /// # Errors
    /// Returns an error if the provider call cannot be started.
    fn stream(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<TextStream>>;

    /// Name of the underlying model.
    fn model_name(&self) -> &str;
}
