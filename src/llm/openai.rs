//! OpenAI-compatible completion client built on rig.
//!
//! Behaviour:
//! - `complete` sends one chat completion and returns the concatenated text of
//!   the first choice. In JSON mode the provider is asked for a JSON object.
//! - `stream` yields the text deltas of a streamed completion, in arrival order.
//!
//! Both calls are bounded by the configured request timeout.

use std::time::Duration;

use futures::StreamExt;
use futures::future;
use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel as _;
use rig::message::{AssistantContent, Message};
use rig::providers::openai;
use rig::streaming::StreamedAssistantContent;
use serde_json::json;

use crate::config::LlmConfig;
use crate::llm::errors::{LlmError, LlmResult};
use crate::llm::{CompletionModel, CompletionRequest, LlmFuture, PromptMessage, PromptRole, TextStream};

/// Content used when the provider returns a choice without text.
const EMPTY_OBJECT: &str = "{}";

/// OpenAI-compatible completion client.
pub struct OpenAiClient {
    model: openai::completion::CompletionModel,
    model_name: String,
    has_api_key: bool,
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a client from configuration.
    ///
    /// A missing API key is reported on the first request, so the server can
    /// still start and serve analysis-only routes.
    ///
    /// # Errors
    /// Returns an error if the provider client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config.api_key.as_deref().unwrap_or_default();
        let client = openai::Client::<ReqwestClient>::builder()
            .api_key(api_key)
            .base_url(config.base_url.trim_end_matches('/'))
            .build()?;
        let model = client
            .completion_model(config.model.clone())
            .completions_api();

        Ok(Self {
            model,
            model_name: config.model.clone(),
            has_api_key: !api_key.is_empty(),
            timeout: config.request_timeout(),
        })
    }

    fn build_request(&self, request: CompletionRequest) -> LlmResult<rig::completion::CompletionRequest> {
        if !self.has_api_key {
            return Err(LlmError::MissingApiKey);
        }

        let temperature = f64::from(request.temperature);
        let json_mode = request.json_mode;
        let split = SplitPrompt::from_messages(request.messages);

        let mut builder = self
            .model
            .completion_request(split.prompt)
            .messages(split.history)
            .temperature(temperature);
        if let Some(preamble) = split.preamble {
            builder = builder.preamble(preamble);
        }
        if json_mode {
            builder = builder.additional_params(json!({ "response_format": { "type": "json_object" } }));
        }
        Ok(builder.build())
    }

    async fn complete_inner(&self, request: CompletionRequest) -> LlmResult<String> {
        let request = self.build_request(request)?;
        let response = tokio::time::timeout(self.timeout, self.model.completion(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))??;

        let text = extract_text(&response.choice);
        if text.trim().is_empty() {
            return Ok(EMPTY_OBJECT.to_string());
        }
        Ok(text)
    }

    async fn stream_inner(&self, request: CompletionRequest) -> LlmResult<TextStream> {
        let request = self.build_request(request)?;
        let response = tokio::time::timeout(self.timeout, self.model.stream(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))??;

        let deltas = response.filter_map(|item| {
            future::ready(match item {
                Ok(StreamedAssistantContent::Text(text)) if !text.text.is_empty() => {
                    Some(Ok(text.text))
                }
                Ok(_) => None,
                Err(err) => Some(Err(LlmError::from(err))),
            })
        });

        Ok(deltas.boxed())
    }
}

impl CompletionModel for OpenAiClient {
    fn complete(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<String>> {
        Box::pin(self.complete_inner(request))
    }

    fn stream(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<TextStream>> {
        Box::pin(self.stream_inner(request))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// A prompt split into the shape rig expects: preamble, history, final turn.
struct SplitPrompt {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: Message,
}

impl SplitPrompt {
    fn from_messages(messages: Vec<PromptMessage>) -> Self {
        let mut system = Vec::new();
        let mut turns = Vec::new();
        for message in messages {
            match message.role {
                PromptRole::System => system.push(message.content),
                PromptRole::User => turns.push(Message::user(message.content)),
                PromptRole::Assistant => turns.push(Message::assistant(message.content)),
            }
        }

        let prompt = turns.pop().unwrap_or_else(|| Message::user(String::new()));
        Self {
            preamble: (!system.is_empty()).then(|| system.join("\n\n")),
            history: turns,
            prompt,
        }
    }
}

fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_prompt_keeps_last_turn_as_prompt() {
        let split = SplitPrompt::from_messages(vec![
            PromptMessage::new(PromptRole::System, "Be brief."),
            PromptMessage::new(PromptRole::User, "Hi"),
            PromptMessage::new(PromptRole::Assistant, "Hello"),
            PromptMessage::new(PromptRole::User, "Shorter please"),
        ]);
        assert_eq!(split.preamble.as_deref(), Some("Be brief."));
        assert_eq!(split.history.len(), 2);
        assert!(matches!(split.prompt, Message::User { .. }));
    }

    #[test]
    fn test_split_prompt_without_system_or_turns() {
        let split = SplitPrompt::from_messages(Vec::new());
        assert!(split.preamble.is_none());
        assert!(split.history.is_empty());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = OpenAiClient::new(&LlmConfig::default()).unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");

        let request = CompletionRequest::json("system", "user", 0.5);
        let err = client.complete(request).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));

        let request = CompletionRequest::json("system", "user", 0.5);
        assert!(matches!(client.stream(request).await, Err(LlmError::MissingApiKey)));
    }
}
