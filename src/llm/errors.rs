//! Error types for the completion client.

use thiserror::Error;

/// Errors produced while talking to the completion provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider HTTP client could not be built.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// The completion call failed at the provider.
    #[error("completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),
    /// The provider did not answer within the request timeout.
    #[error("provider timed out after {0}s")]
    Timeout(u64),
    /// The response did not have the expected shape.
    #[error("provider response malformed: {0}")]
    MalformedResponse(String),
    /// The model output was not valid JSON for the expected payload.
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),
    /// No API key configured.
    #[error("missing API key; set OPENAI_API_KEY")]
    MissingApiKey,
}

/// Convenience result alias for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;
