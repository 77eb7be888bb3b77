//! Memory manager: journal of wizard actions per conversation, gating which
//! actions are allowed next.
//!
//! The in-process table is authoritative. Every mutation is written through to
//! the [`MemoryStore`]; storage failures are logged and never reach callers.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::memory::action::Action;
use crate::memory::errors::MemoryResult;
use crate::memory::ids::ConversationId;
use crate::memory::record::{ConversationMemory, GenerationRecord, MemoryUpdate};
use crate::memory::store::MemoryStore;

/// Journal of generation actions, persisted per conversation.
pub struct MemoryManager {
    memories: DashMap<ConversationId, ConversationMemory>,
    store: Arc<dyn MemoryStore>,
    write_lock: Mutex<()>,
}

impl MemoryManager {
    /// Create a manager and read every stored memory back.
    ///
    /// A failed load is logged and the manager starts empty.
    pub async fn load(store: Arc<dyn MemoryStore>) -> Self {
        let memories = DashMap::new();
        match store.load_all().await {
            Ok(stored) => {
                info!("Loaded {} conversation memories", stored.len());
                for memory in stored {
                    memories.insert(memory.conversation_id, memory);
                }
            }
            Err(e) => error!("Failed to load conversation memories: {e}"),
        }

        Self {
            memories,
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Apply `mutate` and write the result through, serialized per manager.
    async fn mutate_and_persist<F>(&self, id: ConversationId, create: bool, mutate: F) -> bool
    where
        F: FnOnce(&mut ConversationMemory),
    {
        let _guard = self.write_lock.lock().await;

        let snapshot = if create {
            let mut entry = self
                .memories
                .entry(id)
                .or_insert_with(|| ConversationMemory::new(id));
            mutate(entry.value_mut());
            entry.value().clone()
        } else {
            let Some(mut entry) = self.memories.get_mut(&id) else {
                return false;
            };
            mutate(entry.value_mut());
            entry.value().clone()
        };

        if let Err(e) = self.store.set(&snapshot).await {
            warn!("Failed to persist memory for conversation {id}: {e}");
        }
        true
    }

    /// Memory of a conversation, if any.
    #[must_use]
    pub fn get_memory(&self, id: ConversationId) -> Option<ConversationMemory> {
        self.memories.get(&id).map(|entry| entry.value().clone())
    }

    /// Merge `update` into the memory, creating it when absent.
    pub async fn update_memory(&self, id: ConversationId, update: MemoryUpdate) {
        self.mutate_and_persist(id, true, |memory| memory.apply(update))
            .await;
    }

    /// Append a journal record. No-op when the conversation has no memory.
    pub async fn add_generation_record(
        &self,
        id: ConversationId,
        action: Action,
        result: Option<Value>,
        success: bool,
    ) {
        let record = GenerationRecord::new(action, result, success);
        let recorded = self
            .mutate_and_persist(id, false, |memory| memory.generation_history.push(record))
            .await;

        if recorded {
            debug!("Recorded {action} (success: {success}) for conversation {id}");
        } else {
            debug!("Ignoring {action} record for unknown conversation {id}");
        }
    }

    /// Full journal, oldest first.
    #[must_use]
    pub fn get_generation_history(&self, id: ConversationId) -> Vec<GenerationRecord> {
        self.memories
            .get(&id)
            .map(|entry| entry.generation_history.clone())
            .unwrap_or_default()
    }

    /// Distinct actions that succeeded at least once.
    #[must_use]
    pub fn get_completed_actions(&self, id: ConversationId) -> Vec<Action> {
        self.memories
            .get(&id)
            .map(|entry| entry.completed_actions())
            .unwrap_or_default()
    }

    /// Whether `action` is allowed: memory exists and every prerequisite succeeded.
    #[must_use]
    pub fn can_perform_action(&self, id: ConversationId, action: Action) -> bool {
        self.memories
            .get(&id)
            .is_some_and(|entry| entry.allows(action))
    }

    /// Last wizard action label.
    #[must_use]
    pub fn get_last_action(&self, id: ConversationId) -> Option<String> {
        self.memories
            .get(&id)
            .and_then(|entry| entry.user_preferences.last_action.clone())
    }

    /// Remember the last wizard action label.
    pub async fn set_last_action(&self, id: ConversationId, action: &str) {
        self.update_memory(
            id,
            MemoryUpdate {
                last_action: Some(action.to_string()),
                ..MemoryUpdate::default()
            },
        )
        .await;
    }

    /// Pretty JSON of the memory, `null` when absent.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn export_memory(&self, id: ConversationId) -> MemoryResult<String> {
        let memory = self.get_memory(id);
        Ok(serde_json::to_string_pretty(&memory)?)
    }

    /// Forget a conversation, in memory and in storage.
    pub async fn clear_memory(&self, id: ConversationId) {
        let _guard = self.write_lock.lock().await;
        self.memories.remove(&id);
        if let Err(e) = self.store.delete(id).await {
            warn!("Failed to delete memory for conversation {id}: {e}");
        }
    }

    /// Number of conversations with a memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    /// Whether no conversation has a memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}
