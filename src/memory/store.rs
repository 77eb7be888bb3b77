//! Key-value persistence of conversation memories.

use std::future::Future;
use std::pin::Pin;

use dashmap::DashMap;
use tokio_rusqlite::Connection;
use tracing::info;

use crate::config::StorageConfig;
use crate::memory::errors::MemoryResult;
use crate::memory::ids::ConversationId;
use crate::memory::record::ConversationMemory;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Conversation memory store, keyed by conversation id.
pub trait MemoryStore: Send + Sync {
    /// Get the memory of one conversation.
    ///
    /// # Errors
    /// Returns an error if storage access or decoding fails.
    fn get(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<Option<ConversationMemory>>>;

    /// Save or replace a memory.
    ///
    /// # Errors
    /// Returns an error if storage access or encoding fails.
    fn set(&self, memory: &ConversationMemory) -> StoreFuture<'_, MemoryResult<()>>;

    /// Delete a memory. Deleting an unknown id is not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn delete(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<()>>;

    /// Load every stored memory.
    ///
    /// # Errors
    /// Returns an error if storage access or decoding fails.
    fn load_all(&self) -> StoreFuture<'_, MemoryResult<Vec<ConversationMemory>>>;
}

/// Process-local store. Entries are kept serialized so the round trip matches `SQLite`.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<ConversationId, String>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored memories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MemoryStore for InMemoryStore {
    fn get(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<Option<ConversationMemory>>> {
        Box::pin(async move {
            let json = self.entries.get(&id).map(|entry| entry.value().clone());
            match json {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn set(&self, memory: &ConversationMemory) -> StoreFuture<'_, MemoryResult<()>> {
        let encoded = serde_json::to_string(memory).map(|json| (memory.conversation_id, json));
        Box::pin(async move {
            let (id, json) = encoded?;
            self.entries.insert(id, json);
            Ok(())
        })
    }

    fn delete(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<()>> {
        Box::pin(async move {
            self.entries.remove(&id);
            Ok(())
        })
    }

    fn load_all(&self) -> StoreFuture<'_, MemoryResult<Vec<ConversationMemory>>> {
        Box::pin(async move {
            let rows: Vec<String> = self.entries.iter().map(|e| e.value().clone()).collect();
            let mut memories = Vec::with_capacity(rows.len());
            for json in rows {
                memories.push(serde_json::from_str(&json)?);
            }
            Ok(memories)
        })
    }
}

/// `SQLite` implementation of the memory store.
pub struct SqliteMemoryStore {
    conn: Connection,
    table: String,
}

impl SqliteMemoryStore {
    /// Open (or create) the database and its table.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> MemoryResult<Self> {
        if let Some(parent) = config.sqlite_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.sqlite_path).await?;
        let table = config.table.clone();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    conversation_id TEXT PRIMARY KEY,
                    memory_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        info!(
            "Conversation memory store ready at {}",
            config.sqlite_path.display()
        );
        Ok(Self { conn, table })
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn get(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<Option<ConversationMemory>>> {
        Box::pin(async move {
            let table = self.table.clone();

            let row = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT memory_json FROM {table} WHERE conversation_id = ?1"
                    ))?;
                    let mut rows = stmt.query(rusqlite::params![id])?;
                    let json: Option<String> = match rows.next()? {
                        Some(row) => Some(row.get(0)?),
                        None => None,
                    };
                    Ok(json)
                })
                .await?;

            match row {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn set(&self, memory: &ConversationMemory) -> StoreFuture<'_, MemoryResult<()>> {
        let id = memory.conversation_id;
        let encoded = serde_json::to_string(memory);
        Box::pin(async move {
            let table = self.table.clone();
            let memory_json = encoded?;
            let updated_at = chrono::Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (conversation_id, memory_json, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![id, memory_json, updated_at],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn delete(&self, id: ConversationId) -> StoreFuture<'_, MemoryResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE conversation_id = ?1"),
                        rusqlite::params![id],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn load_all(&self) -> StoreFuture<'_, MemoryResult<Vec<ConversationMemory>>> {
        Box::pin(async move {
            let table = self.table.clone();

            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT memory_json FROM {table} ORDER BY updated_at ASC"
                    ))?;
                    let rows = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                })
                .await?;

            let mut memories = Vec::with_capacity(rows.len());
            for json in rows {
                memories.push(serde_json::from_str(&json)?);
            }
            Ok(memories)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::action::Action;
    use crate::memory::record::GenerationRecord;

    fn temp_config(name: &str) -> StorageConfig {
        let path = std::env::temp_dir().join(format!("flowtusk-{name}-{}.sqlite3", uuid::Uuid::new_v4()));
        StorageConfig {
            sqlite_path: path,
            ..StorageConfig::default()
        }
    }

    fn sample_memory() -> ConversationMemory {
        let mut memory = ConversationMemory::new(ConversationId::new());
        memory.website_url = Some("https://acme.io".to_string());
        memory
            .generation_history
            .push(GenerationRecord::new(Action::WebsiteAnalyzed, None, true));
        memory
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryStore::new();
        let memory = sample_memory();

        store.set(&memory).await.unwrap();
        assert_eq!(store.get(memory.conversation_id).await.unwrap(), Some(memory.clone()));
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        store.delete(memory.conversation_id).await.unwrap();
        assert!(store.get(memory.conversation_id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let config = temp_config("store");
        let store = SqliteMemoryStore::new(&config).await.unwrap();
        let memory = sample_memory();

        store.set(&memory).await.unwrap();
        let loaded = store.get(memory.conversation_id).await.unwrap();
        assert_eq!(loaded, Some(memory.clone()));

        // Replacing keeps a single row per conversation
        store.set(&memory).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        store.delete(memory.conversation_id).await.unwrap();
        assert!(store.get(memory.conversation_id).await.unwrap().is_none());

        let _ = std::fs::remove_file(&config.sqlite_path);
    }

    #[tokio::test]
    async fn test_sqlite_store_survives_reopen() {
        let config = temp_config("reopen");
        let memory = sample_memory();
        {
            let store = SqliteMemoryStore::new(&config).await.unwrap();
            store.set(&memory).await.unwrap();
        }

        let reopened = SqliteMemoryStore::new(&config).await.unwrap();
        let all = reopened.load_all().await.unwrap();
        assert_eq!(all, vec![memory]);

        let _ = std::fs::remove_file(&config.sqlite_path);
    }
}
