//! Conversation memory: the persisted journal of wizard actions.
//!
//! - `ids`: conversation identifier
//! - `action`: journal actions and prerequisite table
//! - `record`: journal entries and the per-conversation aggregate
//! - `store`: key-value persistence (`SQLite` or in-process)
//! - `manager`: gating and write-through persistence

pub mod action;
pub mod errors;
pub mod ids;
pub mod manager;
pub mod record;
pub mod store;

pub use action::{Action, UnknownAction};
pub use errors::{MemoryError, MemoryResult};
pub use ids::ConversationId;
pub use manager::MemoryManager;
pub use record::{ConversationMemory, GenerationRecord, MemoryUpdate, UserPreferences};
pub use store::{InMemoryStore, MemoryStore, SqliteMemoryStore, StoreFuture};
