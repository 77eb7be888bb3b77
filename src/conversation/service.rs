//! Conversation service: the wizard state machine.
//!
//! Each operation appends typed messages to the conversation log. Generating
//! steps hold a [`GeneratingGuard`] so at most one step runs per conversation,
//! and the flag is cleared on every exit path. Provider failures never surface
//! as errors: they become an apology message plus an unsuccessful journal entry.
//!
//! Generated content is cached per conversation. A step whose result is
//! already cached still appends its cards and journal entries; only the model
//! call is skipped.

use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::analysis::Analyzer;
use crate::content::{
    Card, ContentGenerator, DEFAULT_SEQUENCE_LENGTH, FunnelSummary, GeneratedContent, Icp,
    IcpBatch, IcpRef, ValuePropCard, extract_first_json_object,
};
use crate::conversation::errors::{ConversationError, ConversationResult};
use crate::conversation::state::{
    ChatMessage, ContentChoice, Conversation, EmailType, FunnelChoice, Phase, Role,
    SEQUENCE_LENGTHS,
};
use crate::generation::{GenerationManager, SCOPE_PARAM};
use crate::llm::{LlmError, PromptMessage, PromptRole, TextStream};
use crate::memory::{Action, ConversationId, MemoryManager, MemoryUpdate};

/// Generation manager specialised to generated marketing content.
pub type ContentManager = GenerationManager<GeneratedContent, LlmError>;

const URL_PATTERN: &str = r"https?://[^\s]+";

const GENERIC_APOLOGY: &str = "Sorry, something went wrong. Please try again.";
const VALUE_PROP_APOLOGY: &str =
    "Sorry, something went wrong generating the value proposition. Please try again.";
const ONE_TIME_EMAIL_APOLOGY: &str =
    "Sorry, something went wrong generating the email. Please try again.";
const SEQUENCE_APOLOGY: &str =
    "Sorry, something went wrong generating the sequence. Please try again.";
const URL_HINT: &str = "Paste your website URL (starting with https://) and I'll analyze it to find your ideal customer profiles.";
const CONTINUE_TO_FUNNEL: &str = "🎉 Great! Your value proposition is ready. Would you like to create an outreach strategy to connect with this audience?";
const LEAD_MAGNET_SOON: &str = "🎨 Lead Magnet Generator is coming soon! This will help you create downloadable resources like checklists, templates, and guides to capture emails.";
const FUNNEL_BENCHMARKS: &str = "25-35% open rate, 5-8% conversion rate, 15-25% lead capture rate";
const VALUE_PROP_PLACEHOLDER: &str = "Your value proposition";

/// Clears `is_generating` when dropped.
struct GeneratingGuard<'a> {
    conversations: &'a DashMap<ConversationId, Conversation>,
    id: ConversationId,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut conversation) = self.conversations.get_mut(&self.id) {
            conversation.is_generating = false;
        }
    }
}

#[derive(Deserialize)]
struct RefinementReply {
    #[serde(default)]
    message: Option<String>,
}

/// Drives the wizard for every live conversation.
pub struct ConversationService {
    conversations: DashMap<ConversationId, Conversation>,
    generator: Arc<ContentGenerator>,
    analyzer: Arc<dyn Analyzer>,
    memory: Arc<MemoryManager>,
    generations: Arc<ContentManager>,
    url_pattern: Regex,
}

impl ConversationService {
    /// Create the service over its collaborators.
    ///
    /// # Errors
    /// Returns an error if the URL pattern cannot be compiled.
    pub fn new(
        generator: Arc<ContentGenerator>,
        analyzer: Arc<dyn Analyzer>,
        memory: Arc<MemoryManager>,
        generations: Arc<ContentManager>,
    ) -> ConversationResult<Self> {
        Ok(Self {
            conversations: DashMap::new(),
            generator,
            analyzer,
            memory,
            generations,
            url_pattern: Regex::new(URL_PATTERN)?,
        })
    }

    /// Memory manager backing the journal.
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    /// Generation manager shared by wizard steps.
    #[must_use]
    pub fn generations(&self) -> &Arc<ContentManager> {
        &self.generations
    }

    // ===== Helpers ==============================================================

    fn read<R>(&self, id: ConversationId, f: impl FnOnce(&Conversation) -> R) -> ConversationResult<R> {
        let conversation = self
            .conversations
            .get(&id)
            .ok_or(ConversationError::NotFound(id))?;
        Ok(f(conversation.value()))
    }

    fn update<R>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&mut Conversation) -> R,
    ) -> ConversationResult<R> {
        let mut conversation = self
            .conversations
            .get_mut(&id)
            .ok_or(ConversationError::NotFound(id))?;
        Ok(f(conversation.value_mut()))
    }

    fn push(&self, id: ConversationId, message: ChatMessage) -> ConversationResult<String> {
        self.update(id, |conversation| conversation.push(message))
    }

    /// Atomically mark a step as running, refusing if one already is.
    fn begin_generation(
        &self,
        id: ConversationId,
        phase: Option<Phase>,
    ) -> ConversationResult<GeneratingGuard<'_>> {
        self.update(id, |conversation| {
            if conversation.is_generating {
                return Err(ConversationError::Busy);
            }
            conversation.is_generating = true;
            if let Some(phase) = phase {
                conversation.phase = phase;
            }
            Ok(())
        })??;

        Ok(GeneratingGuard {
            conversations: &self.conversations,
            id,
        })
    }

    fn ensure_allowed(&self, id: ConversationId, action: Action) -> ConversationResult<()> {
        if self.memory.can_perform_action(id, action) {
            Ok(())
        } else {
            debug!("Refusing {action} for conversation {id}: prerequisites not met");
            Err(ConversationError::ActionNotAllowed(action))
        }
    }

    fn selected_icp(&self, id: ConversationId) -> ConversationResult<Icp> {
        self.read(id, |c| c.selected_icp.clone())?
            .ok_or_else(|| ConversationError::InvalidInput("Select an ICP first".to_string()))
    }

    fn selected_context(&self, id: ConversationId) -> ConversationResult<(Icp, String)> {
        let icp = self.selected_icp(id)?;
        let website_url = self.read(id, |c| c.website_url.clone().unwrap_or_default())?;
        Ok((icp, website_url))
    }

    fn generation_params(id: ConversationId, icp: &Icp, website_url: &str, length: Option<u8>) -> Value {
        let mut params = json!({ "icp": icp.id, "websiteUrl": website_url });
        params[SCOPE_PARAM] = json!(id.to_string());
        if let Some(length) = length {
            params["sequenceLength"] = json!(length);
        }
        params
    }

    fn parse_url(url: &str) -> ConversationResult<Url> {
        Url::parse(url).map_err(|e| ConversationError::InvalidInput(format!("Invalid URL: {e}")))
    }

    /// Run one content generation through the generation manager.
    async fn generate_for(
        &self,
        id: ConversationId,
        action: Action,
        icp: &Icp,
        website_url: &str,
        length: Option<u8>,
    ) -> ConversationResult<GeneratedContent> {
        let params = Self::generation_params(id, icp, website_url, length);
        let generator = Arc::clone(&self.generator);
        let icp = icp.clone();
        let website_url = website_url.to_string();

        let job = move || async move {
            match action {
                Action::ValueProp => generator
                    .generate_value_prop(&icp, &website_url)
                    .await
                    .map(GeneratedContent::ValueProp),
                Action::Linkedin => generator
                    .generate_linkedin_outreach(&icp, &website_url)
                    .await
                    .map(GeneratedContent::LinkedinOutreach),
                Action::Email | Action::EmailSequence => generator
                    .generate_email_sequence(
                        &icp,
                        &website_url,
                        length.unwrap_or(DEFAULT_SEQUENCE_LENGTH),
                    )
                    .await
                    .map(GeneratedContent::EmailSequence),
                Action::OneTimeEmail => generator
                    .generate_one_time_email(&icp, &website_url)
                    .await
                    .map(GeneratedContent::OneTimeEmail),
                Action::Landing => generator
                    .generate_landing_page(&icp, &website_url)
                    .await
                    .map(GeneratedContent::LandingPage),
                other => Err(LlmError::MalformedResponse(format!(
                    "{other} does not produce content"
                ))),
            }
        };

        Ok(self.generations.generate(action.as_str(), &params, job).await?)
    }

    async fn run_analysis(&self, url: &str) -> ConversationResult<IcpBatch> {
        let analysis = self.analyzer.analyze(url).await?;
        info!(
            "Analyzed {url}: {} chars, hero image: {}",
            analysis.content.len(),
            analysis.metadata.hero_image.is_some()
        );
        Ok(self.generator.generate_icps(&analysis.content).await?)
    }

    // ===== Queries ==============================================================

    /// Current state of a conversation.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id.
    pub fn snapshot(&self, id: ConversationId) -> ConversationResult<Conversation> {
        self.read(id, Clone::clone)
    }

    /// Message log of a conversation.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id.
    pub fn messages(&self, id: ConversationId) -> ConversationResult<Vec<ChatMessage>> {
        self.read(id, |c| c.messages.clone())
    }

    /// Pretty JSON export of the conversation memory.
    ///
    /// # Errors
    /// Returns `NotFound` when neither a conversation nor a memory exists.
    pub fn memory_export(&self, id: ConversationId) -> ConversationResult<String> {
        if !self.conversations.contains_key(&id) && self.memory.get_memory(id).is_none() {
            return Err(ConversationError::NotFound(id));
        }
        Ok(self.memory.export_memory(id)?)
    }

    // ===== Lifecycle ============================================================

    /// Start a conversation and its memory.
    pub async fn create_conversation(&self) -> Conversation {
        let id = ConversationId::new();
        let conversation = Conversation::new(id);
        self.conversations.insert(id, conversation.clone());
        self.memory.update_memory(id, MemoryUpdate::default()).await;
        info!("Created conversation {id}");
        conversation
    }

    /// Forget a conversation, its memory and its cached generations.
    ///
    /// # Errors
    /// Returns `NotFound` when neither a conversation nor a memory exists.
    pub async fn clear_conversation(&self, id: ConversationId) -> ConversationResult<()> {
        let removed = self.conversations.remove(&id).is_some();
        let remembered = self.memory.get_memory(id).is_some();
        if !removed && !remembered {
            return Err(ConversationError::NotFound(id));
        }
        self.memory.clear_memory(id).await;
        let evicted = self.generations.evict_scope(&id.to_string());
        info!("Cleared conversation {id} ({evicted} cached generations)");
        Ok(())
    }

    // ===== Wizard steps =========================================================

    /// Handle free text: analyze a URL, refine content, or reply with a hint.
    ///
    /// # Errors
    /// Returns `NotFound`, `Busy`, or `InvalidInput` for empty text or an
    /// unparsable URL. A rejected message is not added to the log.
    pub async fn send_message(&self, id: ConversationId, text: &str) -> ConversationResult<Conversation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConversationError::InvalidInput("Message text is required".to_string()));
        }
        if self.read(id, |c| c.is_generating)? {
            return Err(ConversationError::Busy);
        }

        let url = self.url_pattern.find(text).map(|m| m.as_str().to_string());
        if let Some(url) = &url {
            Self::parse_url(url)?;
        }
        self.push(id, ChatMessage::user(text))?;

        if let Some(url) = url {
            return self.analyze_website(id, &url).await;
        }

        let context = self.read(id, |c| c.selected_icp.clone().zip(c.website_url.clone()))?;
        match context {
            Some((icp, website_url)) => self.refine(id, &icp, &website_url).await,
            None => {
                self.push(id, ChatMessage::assistant(URL_HINT))?;
                self.snapshot(id)
            }
        }
    }

    /// Analyze a website and offer its ICPs.
    ///
    /// # Errors
    /// Returns `NotFound`, `Busy`, or `InvalidInput` for an unparsable URL.
    pub async fn analyze_website(&self, id: ConversationId, url: &str) -> ConversationResult<Conversation> {
        let parsed = Self::parse_url(url)?;
        let host = parsed.host_str().unwrap_or(url).to_string();

        let guard = self.begin_generation(id, Some(Phase::Analysis))?;
        self.update(id, |c| {
            c.title.clone_from(&host);
            c.website_url = Some(url.to_string());
        })?;
        self.memory
            .update_memory(
                id,
                MemoryUpdate {
                    website_url: Some(url.to_string()),
                    ..MemoryUpdate::default()
                },
            )
            .await;

        match self.run_analysis(url).await {
            Ok(batch) => {
                let summary = analysis_summary(&host, &batch);
                let icps = batch.icps.clone();
                self.update(id, |c| {
                    c.icps.clone_from(&icps);
                    c.selected_icp = None;
                    c.phase = Phase::IcpSelection;
                    c.push(ChatMessage::assistant(summary));
                    c.push(ChatMessage::card("", Card::Icps(icps)));
                })?;
                self.memory
                    .add_generation_record(
                        id,
                        Action::WebsiteAnalyzed,
                        Some(json!({ "icps": batch.icps, "summary": batch.summary })),
                        true,
                    )
                    .await;
            }
            Err(e) => {
                warn!("Website analysis failed for conversation {id}: {e}");
                self.push(id, ChatMessage::assistant(GENERIC_APOLOGY))?;
                self.memory
                    .add_generation_record(id, Action::WebsiteAnalyzed, None, false)
                    .await;
            }
        }

        drop(guard);
        self.snapshot(id)
    }

    /// Select an ICP and generate its value proposition.
    ///
    /// # Errors
    /// Returns `NotFound`, `ActionNotAllowed`, `Busy`, or `InvalidInput` for an unknown ICP.
    pub async fn select_icp(&self, id: ConversationId, icp_id: &str) -> ConversationResult<Conversation> {
        self.ensure_allowed(id, Action::SelectIcp)?;
        let icp = self
            .read(id, |c| c.icps.iter().find(|icp| icp.id == icp_id).cloned())?
            .ok_or_else(|| ConversationError::InvalidInput(format!("Unknown ICP: {icp_id}")))?;
        let website_url = self.read(id, |c| c.website_url.clone().unwrap_or_default())?;
        let params = Self::generation_params(id, &icp, &website_url, None);

        if self.generations.is_generating(Action::ValueProp.as_str(), &params) {
            debug!("Value proposition for {} already in progress", icp.id);
            return self.snapshot(id);
        }
        if self.generations.is_completed(Action::ValueProp.as_str(), &params) {
            debug!("Reusing cached value proposition for {}", icp.id);
        }

        let guard = self.begin_generation(id, Some(Phase::ValueProp))?;
        self.record_icp_selection(id, &icp).await?;

        match self
            .generate_for(id, Action::ValueProp, &icp, &website_url, None)
            .await
        {
            Ok(content) => self.show_value_prop(id, &icp, content).await?,
            Err(e) => {
                warn!("Value proposition failed for conversation {id}: {e}");
                self.update(id, |c| {
                    c.phase = Phase::IcpSelection;
                    c.push(ChatMessage::assistant(VALUE_PROP_APOLOGY));
                })?;
                self.memory
                    .add_generation_record(id, Action::ValueProp, None, false)
                    .await;
            }
        }

        drop(guard);
        self.snapshot(id)
    }

    async fn record_icp_selection(&self, id: ConversationId, icp: &Icp) -> ConversationResult<()> {
        self.update(id, |c| {
            c.selected_icp = Some(icp.clone());
            c.push(ChatMessage::user(format!(
                "Create value proposition for: {}",
                icp.title
            )));
        })?;
        self.memory
            .update_memory(
                id,
                MemoryUpdate {
                    selected_icp: Some(icp.clone()),
                    ..MemoryUpdate::default()
                },
            )
            .await;
        self.memory
            .add_generation_record(
                id,
                Action::SelectIcp,
                Some(json!({ "icpId": icp.id, "icpTitle": icp.title })),
                true,
            )
            .await;
        Ok(())
    }

    async fn show_value_prop(
        &self,
        id: ConversationId,
        icp: &Icp,
        content: GeneratedContent,
    ) -> ConversationResult<()> {
        let payload = content.to_json();
        let data = content.into_value_prop().unwrap_or_default();
        self.update(id, |c| {
            c.value_prop = Some(data.clone());
            c.push(ChatMessage::card(
                format!(
                    "Here's your personalized value proposition for **{}**. Customize the variables to match your messaging, then pick the variation that fits best.",
                    icp.title
                ),
                Card::ValueProp(ValuePropCard {
                    data,
                    icp: icp.clone(),
                }),
            ));
            c.push(ChatMessage::card(
                CONTINUE_TO_FUNNEL,
                Card::ContinueToFunnel(IcpRef { icp: icp.clone() }),
            ));
        })?;
        self.memory
            .add_generation_record(id, Action::ValueProp, Some(payload), true)
            .await;
        self.memory.set_last_action(id, Action::SelectIcp.as_str()).await;
        Ok(())
    }

    /// Show the outreach funnel for the selected ICP.
    ///
    /// # Errors
    /// Returns `NotFound`, `ActionNotAllowed`, `Busy`, or `InvalidInput` without a selected ICP.
    pub async fn generate_funnel(&self, id: ConversationId) -> ConversationResult<Conversation> {
        self.ensure_allowed(id, Action::Funnel)?;
        if self.read(id, |c| c.is_generating)? {
            return Err(ConversationError::Busy);
        }
        let icp = self.selected_icp(id)?;
        let value_prop = self.headline_value_prop(id)?;

        let summary = FunnelSummary {
            strategy: format!(
                "This strategy works because {}s typically respond well to personalized email outreach that addresses their specific pain points.",
                persona_label(&icp)
            ),
            benchmarks: FUNNEL_BENCHMARKS.to_string(),
            value_prop: value_prop.clone(),
            icp: icp.clone(),
        };
        self.update(id, |c| {
            c.phase = Phase::Funnel;
            c.push(ChatMessage::card(
                format!("Perfect! Here's your complete outreach strategy for **{}**:", icp.title),
                Card::FunnelSummary(summary),
            ));
            c.push(ChatMessage::card("", Card::FunnelChoice(IcpRef { icp: icp.clone() })));
        })?;
        self.memory
            .add_generation_record(
                id,
                Action::Funnel,
                Some(json!({ "icp": icp, "valueProp": value_prop })),
                true,
            )
            .await;

        self.snapshot(id)
    }

    /// Append a fresh funnel summary.
    ///
    /// # Errors
    /// Returns `NotFound` or `InvalidInput` without a selected ICP.
    pub fn regenerate_funnel_summary(&self, id: ConversationId) -> ConversationResult<Conversation> {
        let icp = self.selected_icp(id)?;
        let value_prop = self.headline_value_prop(id)?;
        let title = icp.title.clone();

        let summary = FunnelSummary {
            strategy: format!(
                "This funnel works because {}s typically respond well to personalized email outreach followed by targeted landing pages that address their specific pain points.",
                persona_label(&icp)
            ),
            benchmarks: FUNNEL_BENCHMARKS.to_string(),
            value_prop,
            icp,
        };
        self.push(
            id,
            ChatMessage::card(
                format!("Here's your updated marketing funnel strategy for **{title}**:"),
                Card::FunnelSummary(summary),
            ),
        )?;
        self.snapshot(id)
    }

    /// Handle the funnel card: email leads to the email type card, landing to the channel card.
    ///
    /// # Errors
    /// Returns `NotFound` or `InvalidInput` without a selected ICP.
    pub fn funnel_choice(&self, id: ConversationId, choice: FunnelChoice) -> ConversationResult<Conversation> {
        let icp = self.selected_icp(id)?;
        let card = match choice {
            FunnelChoice::Email => Card::EmailTypeChoice(IcpRef { icp }),
            FunnelChoice::Landing => Card::ContentChoice(IcpRef { icp }),
        };
        self.update(id, |c| {
            c.phase = Phase::ContentChoice;
            c.push(ChatMessage::card("", card));
        })?;
        self.snapshot(id)
    }

    /// Generate content for the chosen channel.
    ///
    /// # Errors
    /// Returns `NotFound`, `ActionNotAllowed`, `Busy`, or `InvalidInput` without a selected ICP.
    pub async fn content_choice(&self, id: ConversationId, choice: ContentChoice) -> ConversationResult<Conversation> {
        self.ensure_allowed(id, Action::MakeContentChoice)?;
        let (icp, website_url) = self.selected_context(id)?;

        let action = match choice {
            ContentChoice::LeadMagnet => {
                self.push(id, ChatMessage::assistant(LEAD_MAGNET_SOON))?;
                return self.snapshot(id);
            }
            ContentChoice::Linkedin => Action::Linkedin,
            ContentChoice::Email => Action::Email,
            ContentChoice::Landing => Action::Landing,
        };

        let params = Self::generation_params(id, &icp, &website_url, None);
        if self.generations.is_generating(action.as_str(), &params) {
            debug!("{action} for {} already in progress", icp.id);
            return self.snapshot(id);
        }

        let guard = self.begin_generation(id, Some(Phase::Generation))?;
        self.record_content_choice(id, &icp, choice).await?;

        match self.generate_for(id, action, &icp, &website_url, None).await {
            Ok(content) => self.show_content(id, &icp, action, choice, content).await?,
            Err(e) => {
                warn!("{action} generation failed for conversation {id}: {e}");
                self.update(id, |c| {
                    c.phase = Phase::ContentChoice;
                    c.push(ChatMessage::assistant(format!(
                        "Sorry, something went wrong generating the {}. Please try again.",
                        choice.title()
                    )));
                })?;
                self.memory.add_generation_record(id, action, None, false).await;
            }
        }

        drop(guard);
        self.snapshot(id)
    }

    async fn record_content_choice(
        &self,
        id: ConversationId,
        icp: &Icp,
        choice: ContentChoice,
    ) -> ConversationResult<()> {
        self.push(
            id,
            ChatMessage::user(format!("Generate {} for: {}", choice.title(), icp.title)),
        )?;
        self.memory
            .add_generation_record(
                id,
                Action::MakeContentChoice,
                Some(json!({ "choice": choice.as_str() })),
                true,
            )
            .await;
        self.memory
            .update_memory(
                id,
                MemoryUpdate {
                    preferred_content_type: Some(choice.as_str().to_string()),
                    ..MemoryUpdate::default()
                },
            )
            .await;
        Ok(())
    }

    async fn show_content(
        &self,
        id: ConversationId,
        icp: &Icp,
        action: Action,
        choice: ContentChoice,
        content: GeneratedContent,
    ) -> ConversationResult<()> {
        let payload = content.to_json();
        let card = Card::for_content(content, icp);
        self.update(id, |c| {
            c.phase = Phase::Complete;
            c.push(ChatMessage::card(
                format!(
                    "Here's your {} for **{}**. All messages are ready to copy and customize!",
                    choice.title(),
                    icp.title
                ),
                card,
            ));
            c.push(ChatMessage::card(
                format!("Want to create more content for **{}**?", icp.title),
                Card::ContentChoice(IcpRef { icp: icp.clone() }),
            ));
        })?;
        self.memory
            .add_generation_record(id, action, Some(payload), true)
            .await;
        self.memory.set_last_action(id, "content-choice").await;
        Ok(())
    }

    /// Handle the email type card.
    ///
    /// # Errors
    /// Returns `NotFound`, `ActionNotAllowed`, `Busy`, or `InvalidInput` without a selected ICP.
    pub async fn email_type_choice(&self, id: ConversationId, email_type: EmailType) -> ConversationResult<Conversation> {
        match email_type {
            EmailType::OneTime => self.deliver_email(id, Action::OneTimeEmail, None).await,
            EmailType::Sequence => {
                let icp = self.selected_icp(id)?;
                self.push(id, ChatMessage::card("", Card::SequenceLengthChoice(IcpRef { icp })))?;
                self.snapshot(id)
            }
        }
    }

    /// Generate an email sequence of `days` emails (5, 7 or 10).
    ///
    /// # Errors
    /// Returns `InvalidInput` for any other length, otherwise as [`Self::email_type_choice`].
    pub async fn sequence_length_choice(&self, id: ConversationId, days: u8) -> ConversationResult<Conversation> {
        if !SEQUENCE_LENGTHS.contains(&days) {
            return Err(ConversationError::InvalidInput(format!(
                "Sequence length must be one of {SEQUENCE_LENGTHS:?}"
            )));
        }
        self.deliver_email(id, Action::EmailSequence, Some(days)).await
    }

    async fn deliver_email(
        &self,
        id: ConversationId,
        action: Action,
        length: Option<u8>,
    ) -> ConversationResult<Conversation> {
        self.ensure_allowed(id, action)?;
        let (icp, website_url) = self.selected_context(id)?;
        let guard = self.begin_generation(id, Some(Phase::Generation))?;

        let (request, heading, apology) = match length {
            Some(days) => (
                format!("Generate {days}-day email sequence for: {}", icp.title),
                format!("Here's your **{days}-Day Email Sequence** for **{}**:", icp.title),
                SEQUENCE_APOLOGY,
            ),
            None => (
                format!("Generate one-time email for: {}", icp.title),
                format!("Here's your **One-Time Email** for **{}**:", icp.title),
                ONE_TIME_EMAIL_APOLOGY,
            ),
        };
        self.push(id, ChatMessage::user(request))?;

        match self.generate_for(id, action, &icp, &website_url, length).await {
            Ok(content) => {
                let payload = content.to_json();
                let card = Card::for_content(content, &icp);
                self.update(id, |c| {
                    c.phase = Phase::Complete;
                    c.push(ChatMessage::card(heading, card));
                })?;
                self.memory
                    .add_generation_record(id, action, Some(payload), true)
                    .await;
            }
            Err(e) => {
                warn!("{action} generation failed for conversation {id}: {e}");
                self.update(id, |c| {
                    c.phase = Phase::ContentChoice;
                    c.push(ChatMessage::assistant(apology));
                })?;
                self.memory.add_generation_record(id, action, None, false).await;
            }
        }

        drop(guard);
        self.snapshot(id)
    }

    /// Stream a refinement reply into one assistant message.
    ///
    /// # Errors
    /// Returns `NotFound` or `Busy`.
    pub async fn refine(&self, id: ConversationId, icp: &Icp, website_url: &str) -> ConversationResult<Conversation> {
        let guard = self.begin_generation(id, None)?;
        let history = self.read(id, |c| {
            c.messages
                .iter()
                .filter(|m| !m.content.is_empty())
                .map(|m| {
                    let role = match m.role {
                        Role::User => PromptRole::User,
                        Role::Assistant => PromptRole::Assistant,
                    };
                    PromptMessage::new(role, m.content.clone())
                })
                .collect::<Vec<_>>()
        })?;
        let message_id = self.push(id, ChatMessage::assistant(""))?;

        match self.generator.stream_refinement(history, website_url, icp).await {
            Ok(deltas) => {
                let reply = self.stream_into(id, &message_id, deltas).await?;
                if let Some(message) = refined_message(&reply) {
                    self.set_message(id, &message_id, message)?;
                }
            }
            Err(e) => {
                warn!("Refinement failed for conversation {id}: {e}");
                self.set_message(id, &message_id, GENERIC_APOLOGY.to_string())?;
            }
        }

        drop(guard);
        self.snapshot(id)
    }

    /// Append every delta to the message as it arrives and return the full reply.
    /// A stream error ends the reply early with whatever arrived.
    async fn stream_into(
        &self,
        id: ConversationId,
        message_id: &str,
        mut deltas: TextStream,
    ) -> ConversationResult<String> {
        let mut reply = String::new();
        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    reply.push_str(&delta);
                    self.update(id, |c| {
                        if let Some(message) = c.message_mut(message_id) {
                            message.content.push_str(&delta);
                        }
                    })?;
                }
                Err(e) => {
                    warn!("Refinement stream for conversation {id} ended early: {e}");
                    break;
                }
            }
        }
        Ok(reply)
    }

    fn set_message(&self, id: ConversationId, message_id: &str, content: String) -> ConversationResult<()> {
        self.update(id, |c| {
            if let Some(message) = c.message_mut(message_id) {
                message.content = content;
            }
        })
    }

    fn headline_value_prop(&self, id: ConversationId) -> ConversationResult<String> {
        self.read(id, |c| {
            c.value_prop
                .as_ref()
                .and_then(|vp| vp.variations.first())
                .map(|variation| variation.text.clone())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| VALUE_PROP_PLACEHOLDER.to_string())
        })
    }
}

fn persona_label(icp: &Icp) -> &str {
    if icp.persona_role.trim().is_empty() {
        &icp.title
    } else {
        &icp.persona_role
    }
}

/// `message` field of the first JSON object in a refinement reply.
fn refined_message(reply: &str) -> Option<String> {
    let block = extract_first_json_object(reply)?;
    let parsed: RefinementReply = serde_json::from_str(block).ok()?;
    parsed.message.filter(|message| !message.trim().is_empty())
}

/// Markdown summary shown after a website analysis.
fn analysis_summary(host: &str, batch: &IcpBatch) -> String {
    let hostname = host.replacen("www.", "", 1);
    let summary = &batch.summary;
    let business = if summary.business_description.trim().is_empty() {
        "your business"
    } else {
        summary.business_description.as_str()
    };
    let target = if summary.target_market.trim().is_empty() {
        String::new()
    } else {
        format!(" {}", summary.target_market)
    };
    let pains = summary
        .pain_points_with_metrics
        .iter()
        .take(3)
        .map(|p| format!("• **{}**: {}", p.pain, p.metric))
        .collect::<Vec<_>>()
        .join("\n");
    let multiplier = if summary.opportunity_multiplier.trim().is_empty() {
        "3"
    } else {
        summary.opportunity_multiplier.as_str()
    };

    format!(
        "I've analyzed **{hostname}** and discovered key insights:\n\n{business}{target}\n\n**Key Pain Points & Impact:**\n{pains}\n\n**Growth Opportunity:** By targeting the right customer profile with personalized messaging, you have potential to reach up to **{multiplier}x more qualified leads** and significantly improve conversion rates.\n\nI've identified **{}** ideal customer profiles below. Select one to customize your funnel:",
        batch.icps.len()
    )
}
