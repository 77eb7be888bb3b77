//! Application state shared across all request handlers.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::analysis::{Analyzer, WebsiteAnalyzer};
use crate::config::AppConfig;
use crate::content::ContentGenerator;
use crate::conversation::{ContentManager, ConversationService};
use crate::llm::{CompletionModel, OpenAiClient};
use crate::memory::{MemoryManager, MemoryStore, SqliteMemoryStore};

/// Shared application state.
pub struct AppState {
    /// Content generator used by the stateless generation endpoints.
    pub generator: Arc<ContentGenerator>,
    /// Website analyzer.
    pub analyzer: Arc<dyn Analyzer>,
    /// Conversation wizard.
    pub conversations: ConversationService,
}

impl AppState {
    /// Build the production state: OpenAI-compatible model, HTTP analyzer, SQLite memory.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a component cannot be created.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Arc<Self>> {
        config.validate().context("Invalid configuration")?;

        let model = OpenAiClient::new(&config.llm).context("Failed to create LLM client")?;
        let analyzer = WebsiteAnalyzer::new(config.scraping.clone())
            .context("Failed to create website analyzer")?;
        let store = SqliteMemoryStore::new(&config.storage)
            .await
            .with_context(|| {
                format!("Failed to open memory store at {}", config.storage.sqlite_path.display())
            })?;

        info!(
            "Model {} at {}, memory at {}",
            config.llm.model,
            config.llm.base_url,
            config.storage.sqlite_path.display()
        );

        Self::from_parts(Arc::new(model), Arc::new(analyzer), Arc::new(store)).await
    }

    /// Build the state from explicit components.
    ///
    /// # Errors
    /// Returns an error if the conversation service cannot be created.
    pub async fn from_parts(
        model: Arc<dyn CompletionModel>,
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn MemoryStore>,
    ) -> anyhow::Result<Arc<Self>> {
        let generator = Arc::new(ContentGenerator::new(model));
        let memory = Arc::new(MemoryManager::load(store).await);
        let conversations = ConversationService::new(
            Arc::clone(&generator),
            Arc::clone(&analyzer),
            memory,
            Arc::new(ContentManager::new()),
        )?;

        Ok(Arc::new(Self {
            generator,
            analyzer,
            conversations,
        }))
    }
}
