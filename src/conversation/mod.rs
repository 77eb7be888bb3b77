//! Conversation wizard: message log, phases and step handlers.

pub mod errors;
pub mod service;
pub mod state;

pub use errors::{ConversationError, ConversationResult};
pub use service::{ContentManager, ConversationService};
pub use state::{
    ChatMessage, ChoiceParseError, ContentChoice, Conversation, DEFAULT_TITLE, EmailType,
    FunnelChoice, Phase, Role, SEQUENCE_LENGTHS,
};
