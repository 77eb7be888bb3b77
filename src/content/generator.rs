//! Content generator: prompt construction plus JSON decoding of model output.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::content::prompts;
use crate::content::types::{
    EmailSequenceData, Icp, IcpBatch, LandingPageData, LandingSection, LandingSectionContent,
    LinkedInOutreachData, OneTimeEmailData, SectionMode, ValuePropData,
};
use crate::llm::{
    CompletionModel, CompletionRequest, LlmResult, PromptMessage, PromptRole, TextStream,
};

/// Default number of emails in a sequence.
pub const DEFAULT_SEQUENCE_LENGTH: u8 = 5;

const ICP_TEMPERATURE: f32 = 0.8;
const COPY_TEMPERATURE: f32 = 0.8;
const LANDING_TEMPERATURE: f32 = 0.9;
const CHAT_TEMPERATURE: f32 = 0.7;

#[derive(Deserialize)]
struct SectionEnvelope {
    #[serde(rename = "sectionData", default)]
    section_data: Value,
}

/// Generates marketing content by prompting a completion model.
pub struct ContentGenerator {
    model: Arc<dyn CompletionModel>,
}

impl ContentGenerator {
    /// Create a generator over the given model.
    #[must_use]
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Name of the model in use.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        label: &str,
        request: CompletionRequest,
    ) -> LlmResult<T> {
        let started = std::time::Instant::now();
        let raw = self.model.complete(request).await?;
        debug!(
            "[{label}] completion finished in {}ms",
            started.elapsed().as_millis()
        );
        Ok(serde_json::from_str(&raw)?)
    }

    /// Generate three ICPs, brand colors and a business summary from website text.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_icps(&self, content: &str) -> LlmResult<IcpBatch> {
        info!("[generate-icps] content length: {} chars", content.len());
        let request = CompletionRequest::json(
            prompts::ICP_SYSTEM_PROMPT,
            prompts::icp_user_prompt(content),
            ICP_TEMPERATURE,
        );
        let mut batch: IcpBatch = self.complete_json("generate-icps", request).await?;
        ensure_unique_ids(&mut batch.icps);
        info!("[generate-icps] generated {} profiles", batch.icps.len());
        Ok(batch)
    }

    /// Generate a value proposition template and variations for an ICP.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_value_prop(&self, icp: &Icp, website_url: &str) -> LlmResult<ValuePropData> {
        let request = CompletionRequest::json(
            prompts::VALUE_PROP_SYSTEM_PROMPT,
            format!(
                "{}\n\nGenerate the value proposition in JSON format.",
                prompts::icp_details(icp, website_url)
            ),
            COPY_TEMPERATURE,
        );
        self.complete_json("generate-value-prop", request).await
    }

    /// Generate a LinkedIn outreach sequence.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_linkedin_outreach(
        &self,
        icp: &Icp,
        website_url: &str,
    ) -> LlmResult<LinkedInOutreachData> {
        let request = CompletionRequest::json(
            prompts::LINKEDIN_SYSTEM_PROMPT,
            format!(
                "{}\n\nGenerate the LinkedIn sequence in JSON format.",
                prompts::icp_details(icp, website_url)
            ),
            COPY_TEMPERATURE,
        );
        self.complete_json("generate-linkedin-outreach", request).await
    }

    /// Generate an email nurture sequence of `length` emails.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_email_sequence(
        &self,
        icp: &Icp,
        website_url: &str,
        length: u8,
    ) -> LlmResult<EmailSequenceData> {
        let request = CompletionRequest::json(
            prompts::email_sequence_system_prompt(length),
            format!(
                "{}\n\nGenerate the {length}-email sequence in JSON format.",
                prompts::icp_details(icp, website_url)
            ),
            COPY_TEMPERATURE,
        );
        self.complete_json("generate-email-sequence", request).await
    }

    /// Generate a standalone email.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_one_time_email(
        &self,
        icp: &Icp,
        website_context: &str,
    ) -> LlmResult<OneTimeEmailData> {
        let request = CompletionRequest::json(
            prompts::ONE_TIME_EMAIL_SYSTEM_PROMPT,
            format!(
                "{}\n\nGenerate the email in JSON format.",
                prompts::icp_details(icp, website_context)
            ),
            COPY_TEMPERATURE,
        );
        self.complete_json("generate-one-time-email", request).await
    }

    /// Generate one landing section. Returns the `sectionData` object, `null` when absent.
    ///
    /// # Errors
    /// Returns an error if the model call fails or its output is not JSON.
    pub async fn generate_landing_section(
        &self,
        icp: &Icp,
        website_url: &str,
        section: LandingSection,
        mode: SectionMode,
    ) -> LlmResult<Value> {
        info!("[generate-section] {section} ({}) for {}", mode.as_str(), icp.title);
        let request = CompletionRequest::json(
            prompts::landing_system_prompt(section, mode),
            format!(
                "{}\n\nGenerate the {section} section in JSON format ({} mode).",
                prompts::icp_details(icp, website_url),
                mode.as_str()
            ),
            LANDING_TEMPERATURE,
        );
        let envelope: SectionEnvelope = self.complete_json("generate-section", request).await?;
        Ok(envelope.section_data)
    }

    /// Generate every landing section in full mode, in page order.
    ///
    /// # Errors
    /// Returns the first section failure.
    pub async fn generate_landing_page(&self, icp: &Icp, website_url: &str) -> LlmResult<LandingPageData> {
        let mut sections = Vec::with_capacity(LandingSection::PAGE_ORDER.len());
        for section in LandingSection::PAGE_ORDER {
            let section_data = self
                .generate_landing_section(icp, website_url, section, SectionMode::Full)
                .await?;
            sections.push(LandingSectionContent {
                section,
                section_data,
            });
        }
        Ok(LandingPageData { sections })
    }

    /// Start a streamed refinement reply over the given chat history.
    ///
    /// # Errors
    /// Returns an error if the stream cannot be started.
    pub async fn stream_refinement(
        &self,
        history: Vec<PromptMessage>,
        website_url: &str,
        icp: &Icp,
    ) -> LlmResult<TextStream> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(PromptMessage::new(
            PromptRole::System,
            format!(
                "{}\n\n{}",
                prompts::CHAT_SYSTEM_PROMPT,
                prompts::icp_details(icp, website_url)
            ),
        ));
        messages.extend(history);

        self.model
            .stream(CompletionRequest {
                messages,
                temperature: CHAT_TEMPERATURE,
                json_mode: false,
            })
            .await
    }
}

/// Id the ICP prompt shows the model as an example value.
const PLACEHOLDER_ICP_ID: &str = "unique-id";

/// Give every profile a non-empty id distinct from the others in the batch.
/// The prompt's placeholder id is always replaced.
fn ensure_unique_ids(icps: &mut [Icp]) {
    let mut seen = HashSet::new();
    for icp in icps {
        let id = icp.id.trim();
        if id.is_empty() || id == PLACEHOLDER_ICP_ID || !seen.insert(icp.id.clone()) {
            icp.id = nanoid::nanoid!(10);
            seen.insert(icp.id.clone());
        }
    }
}

/// Extract the first balanced `{...}` block from free text.
#[must_use]
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0_usize;

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &text[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedModel;
    use serde_json::json;

    fn icp() -> Icp {
        Icp {
            id: "founders".to_string(),
            title: "Seed-stage Founders".to_string(),
            ..Icp::default()
        }
    }

    #[tokio::test]
    async fn test_generate_icps_fills_defaults_and_unique_ids() {
        let model = Arc::new(ScriptedModel::new().reply(
            "Ideal Customer Profiles",
            json!({ "icps": [
                { "id": "unique-id", "title": "A" },
                { "id": "unique-id", "title": "B" },
                { "title": "C" }
            ]}),
        ));
        let generator = ContentGenerator::new(model);
        let batch = generator.generate_icps("We sell widgets").await.unwrap();

        assert_eq!(batch.icps.len(), 3);
        assert!(batch.icps.iter().all(|icp| !icp.id.is_empty() && icp.id != "unique-id"));
        assert_ne!(batch.icps[0].id, batch.icps[1].id);
        assert_eq!(batch.brand_colors.primary, "#FF6B9D");
    }

    #[tokio::test]
    async fn test_landing_section_returns_section_data() {
        let model = Arc::new(ScriptedModel::new().reply(
            "high-converting B2B landing pages",
            json!({ "sectionData": { "headline": "Ship faster" } }),
        ));
        let generator = ContentGenerator::new(model.clone());
        let data = generator
            .generate_landing_section(&icp(), "https://x.io", LandingSection::Hero, SectionMode::Full)
            .await
            .unwrap();

        assert_eq!(data["headline"], "Ship faster");
        let request = model.last_request().unwrap();
        assert!((request.temperature - LANDING_TEMPERATURE).abs() < f32::EPSILON);
        assert!(request.json_mode);
    }

    #[tokio::test]
    async fn test_landing_page_generates_every_section() {
        let model = Arc::new(ScriptedModel::new().reply(
            "high-converting B2B landing pages",
            json!({ "sectionData": { "x": 1 } }),
        ));
        let generator = ContentGenerator::new(model.clone());
        let page = generator.generate_landing_page(&icp(), "https://x.io").await.unwrap();

        assert_eq!(page.sections.len(), LandingSection::PAGE_ORDER.len());
        assert_eq!(page.sections[0].section, LandingSection::Hero);
        assert_eq!(model.calls(), LandingSection::PAGE_ORDER.len());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        struct Garbage;
        impl CompletionModel for Garbage {
            fn complete(&self, _request: CompletionRequest) -> crate::llm::LlmFuture<'_, LlmResult<String>> {
                Box::pin(async { Ok("not json".to_string()) })
            }
            fn stream(&self, _request: CompletionRequest) -> crate::llm::LlmFuture<'_, LlmResult<TextStream>> {
                Box::pin(async { Err(crate::llm::LlmError::MissingApiKey) })
            }
            fn model_name(&self) -> &str {
                "garbage"
            }
        }
        let generator = ContentGenerator::new(Arc::new(Garbage));
        assert!(generator.generate_one_time_email(&icp(), "ctx").await.is_err());
    }

    #[test]
    fn test_extract_first_json_object() {
        let text = "Sure! {\"message\": \"done\", \"updates\": {\"a\": 1}} trailing";
        assert_eq!(
            extract_first_json_object(text),
            Some("{\"message\": \"done\", \"updates\": {\"a\": 1}}")
        );
        assert_eq!(extract_first_json_object("no braces"), None);
        assert_eq!(extract_first_json_object("{ unbalanced"), None);
    }
}
