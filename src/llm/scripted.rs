//! Scripted completion model for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rig::completion::CompletionError;

use crate::llm::{CompletionModel, CompletionRequest, LlmError, LlmFuture, LlmResult, TextStream};

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// Answers requests by matching a marker against the system prompt.
pub(crate) struct ScriptedModel {
    rules: Vec<(String, Reply)>,
    chunks: Vec<String>,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self {
            rules: Vec::new(),
            chunks: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn reply(mut self, marker: &str, body: serde_json::Value) -> Self {
        self.rules.push((marker.to_string(), Reply::Text(body.to_string())));
        self
    }

    pub(crate) fn fail(mut self, marker: &str) -> Self {
        self.rules.push((marker.to_string(), Reply::Fail));
        self
    }

    pub(crate) fn stream_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(ToString::to_string).collect();
        self
    }

    pub(crate) const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<CompletionRequest> {
        self.seen.lock().ok().and_then(|seen| seen.last().cloned())
    }

    fn record(&self, request: &CompletionRequest) -> Option<Reply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        let system = request.system_prompt().unwrap_or_default();
        self.rules
            .iter()
            .find(|(marker, _)| system.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

impl CompletionModel for ScriptedModel {
    fn complete(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<String>> {
        Box::pin(async move {
            let reply = self.record(&request);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match reply {
                Some(Reply::Text(body)) => Ok(body),
                Some(Reply::Fail) => Err(LlmError::Completion(CompletionError::ProviderError(
                    "scripted failure".to_string(),
                ))),
                None => Ok("{}".to_string()),
            }
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmFuture<'_, LlmResult<TextStream>> {
        Box::pin(async move {
            if let Some(Reply::Fail) = self.record(&request) {
                return Err(LlmError::MalformedResponse("scripted failure".to_string()));
            }
            let items: Vec<LlmResult<String>> = self.chunks.iter().cloned().map(Ok).collect();
            let deltas: TextStream = stream::iter(items).boxed();
            Ok(deltas)
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
