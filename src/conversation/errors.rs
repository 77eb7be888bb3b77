//! Error types for the conversation wizard.

use std::sync::Arc;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::llm::LlmError;
use crate::memory::{Action, ConversationId, MemoryError};

/// Conversation errors.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// No conversation with this id.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),
    /// The journal does not allow this action yet.
    #[error("action not allowed: {0}")]
    ActionNotAllowed(Action),
    /// Another wizard step is running.
    #[error("a generation is already in progress")]
    Busy,
    /// The request is missing data or refers to unknown data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Content generation failed.
    #[error("generation failed: {0}")]
    Generation(Arc<LlmError>),
    /// Website analysis failed.
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    /// Memory export failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Pattern compilation failed.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LlmError> for ConversationError {
    fn from(value: LlmError) -> Self {
        Self::Generation(Arc::new(value))
    }
}

impl From<Arc<LlmError>> for ConversationError {
    fn from(value: Arc<LlmError>) -> Self {
        Self::Generation(value)
    }
}

/// Convenience result alias for conversation operations.
pub type ConversationResult<T> = Result<T, ConversationError>;
