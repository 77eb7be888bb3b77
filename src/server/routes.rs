//! HTTP route handlers for the Flowtusk API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::analysis::{AnalysisError, WebsiteAnalysis};
use crate::content::{
    DEFAULT_SEQUENCE_LENGTH, EmailSequenceData, Icp, IcpBatch, LandingSection,
    LinkedInOutreachData, OneTimeEmailData, SectionMode, ValuePropData,
};
use crate::llm::{LlmError, PromptMessage, PromptRole};

use super::conversations;
use super::errors::{ApiError, ApiResult};
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze-website", post(analyze_website))
        .route("/api/generate-icps", post(generate_icps))
        .route("/api/generate-value-prop", post(generate_value_prop))
        .route("/api/generate-linkedin-outreach", post(generate_linkedin_outreach))
        .route("/api/generate-email-sequence", post(generate_email_sequence))
        .route("/api/generate-one-time-email", post(generate_one_time_email))
        .route("/api/generate-landing-page", post(generate_landing_section))
        .route("/api/chat", post(chat))
        .route("/api/conversations", post(conversations::create))
        .route(
            "/api/conversations/{id}",
            get(conversations::snapshot).delete(conversations::clear),
        )
        .route("/api/conversations/{id}/messages", post(conversations::send_message))
        .route("/api/conversations/{id}/select-icp", post(conversations::select_icp))
        .route("/api/conversations/{id}/funnel", post(conversations::funnel))
        .route(
            "/api/conversations/{id}/funnel/regenerate",
            post(conversations::regenerate_funnel),
        )
        .route("/api/conversations/{id}/funnel-choice", post(conversations::funnel_choice))
        .route("/api/conversations/{id}/content-choice", post(conversations::content_choice))
        .route("/api/conversations/{id}/email-type", post(conversations::email_type))
        .route(
            "/api/conversations/{id}/sequence-length",
            post(conversations::sequence_length),
        )
        .route("/api/conversations/{id}/memory", get(conversations::memory))
        .route("/api/generations/cache", delete(conversations::clear_generation_cache))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "flowtusk",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn provider_error(context: &str, err: &LlmError) -> ApiError {
    ApiError::internal(context, err, &format!("Failed to {context}"))
}

fn require_icp(icp: Option<Icp>) -> ApiResult<Icp> {
    icp.ok_or_else(|| ApiError::bad_request("ICP is required"))
}

/// Website analysis request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    /// Page to analyze.
    pub url: Option<String>,
}

async fn analyze_website(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<WebsiteAnalysis>> {
    let Json(request) = payload?;
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    match state.analyzer.analyze(url.trim()).await {
        Ok(analysis) => {
            info!("[analyze-website] {} words from {}", analysis.word_count(), analysis.final_url);
            Ok(Json(analysis))
        }
        Err(e @ (AnalysisError::InvalidUrl(_) | AnalysisError::UnsupportedScheme(_))) => {
            Err(ApiError::BadRequest(e.to_string()))
        }
        Err(e) => Err(ApiError::internal(
            "analyze website",
            &e,
            "Failed to analyze website",
        )),
    }
}

/// ICP generation request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateIcpsRequest {
    /// Visible website text.
    pub content: Option<String>,
}

async fn generate_icps(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateIcpsRequest>, JsonRejection>,
) -> ApiResult<Json<IcpBatch>> {
    let Json(request) = payload?;
    let content = request
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Content is required"))?;

    state
        .generator
        .generate_icps(&content)
        .await
        .map(Json)
        .map_err(|e| provider_error("generate ICPs", &e))
}

/// Request carrying a profile and its website.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IcpRequest {
    /// Target profile.
    pub icp: Option<Icp>,
    /// Website the content promotes.
    pub website_url: String,
}

async fn generate_value_prop(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IcpRequest>, JsonRejection>,
) -> ApiResult<Json<ValuePropData>> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;

    state
        .generator
        .generate_value_prop(&icp, &request.website_url)
        .await
        .map(Json)
        .map_err(|e| provider_error("generate value proposition", &e))
}

async fn generate_linkedin_outreach(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IcpRequest>, JsonRejection>,
) -> ApiResult<Json<LinkedInOutreachData>> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;

    state
        .generator
        .generate_linkedin_outreach(&icp, &request.website_url)
        .await
        .map(Json)
        .map_err(|e| provider_error("generate LinkedIn outreach", &e))
}

/// Email sequence request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailSequenceRequest {
    /// Target profile.
    pub icp: Option<Icp>,
    /// Website the sequence promotes.
    pub website_url: String,
    /// Number of emails, 5 when absent.
    pub sequence_length: Option<u8>,
}

async fn generate_email_sequence(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailSequenceRequest>, JsonRejection>,
) -> ApiResult<Json<EmailSequenceData>> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;
    let length = request
        .sequence_length
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SEQUENCE_LENGTH);

    state
        .generator
        .generate_email_sequence(&icp, &request.website_url, length)
        .await
        .map(Json)
        .map_err(|e| provider_error("generate email sequence", &e))
}

/// One-time email request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OneTimeEmailRequest {
    /// Target profile.
    pub icp: Option<Icp>,
    /// Free-form website context.
    pub website_context: String,
}

async fn generate_one_time_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OneTimeEmailRequest>, JsonRejection>,
) -> ApiResult<Json<OneTimeEmailData>> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;

    state
        .generator
        .generate_one_time_email(&icp, &request.website_context)
        .await
        .map(Json)
        .map_err(|e| provider_error("generate one-time email", &e))
}

/// Landing section request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LandingSectionRequest {
    /// Target profile.
    pub icp: Option<Icp>,
    /// Website the page promotes.
    pub website_url: String,
    /// Section name.
    pub section: Option<String>,
    /// `full` or `title`.
    pub mode: Option<String>,
}

async fn generate_landing_section(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LandingSectionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;
    let section: LandingSection = request
        .section
        .ok_or_else(|| ApiError::bad_request("Section is required"))?
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid section"))?;
    let mode = SectionMode::parse_lenient(request.mode.as_deref());

    let section_data = state
        .generator
        .generate_landing_section(&icp, &request.website_url, section, mode)
        .await
        .map_err(|e| provider_error("generate landing section", &e))?;

    Ok(Json(json!({ "sectionData": section_data })))
}

/// One turn of chat history.
#[derive(Debug, Deserialize)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    pub role: String,
    /// Turn text.
    pub content: String,
}

/// Refinement chat request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatRequest {
    /// Prior turns, oldest first.
    pub messages: Vec<ChatTurn>,
    /// Website being marketed.
    pub website_url: String,
    /// Target profile.
    pub icp: Option<Icp>,
}

/// Stream a refinement reply as `text/plain`.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let icp = require_icp(request.icp)?;
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Messages are required"));
    }

    let history = request
        .messages
        .into_iter()
        .map(|turn| {
            let role = if turn.role == "assistant" {
                PromptRole::Assistant
            } else {
                PromptRole::User
            };
            PromptMessage::new(role, turn.content)
        })
        .collect();

    let deltas = state
        .generator
        .stream_refinement(history, &request.website_url, &icp)
        .await
        .map_err(|e| provider_error("start chat stream", &e))?;

    let body = deltas
        .take_while(|delta| {
            if let Err(e) = delta {
                warn!("Chat stream ended early: {e}");
            }
            futures::future::ready(delta.is_ok())
        })
        .filter_map(|delta| futures::future::ready(delta.ok()))
        .map(Ok::<_, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::fixture::StaticAnalyzer;
    use crate::llm::scripted::ScriptedModel;
    use crate::memory::InMemoryStore;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    pub(crate) async fn router(model: ScriptedModel) -> Router {
        let state = AppState::from_parts(
            Arc::new(model),
            Arc::new(StaticAnalyzer::with_content("Acme builds reusable rockets")),
            Arc::new(InMemoryStore::new()),
        )
        .await
        .unwrap();
        create_router(state)
    }

    pub(crate) async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn icp() -> Value {
        json!({ "id": "ops", "title": "Ops Leaders" })
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(ScriptedModel::new()).await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "flowtusk");
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_requests() {
        let app = router(ScriptedModel::new()).await;

        let cases = [
            ("/api/generate-icps", json!({}), "Content is required"),
            ("/api/generate-icps", json!({ "content": "  " }), "Content is required"),
            ("/api/generate-value-prop", json!({ "websiteUrl": "https://x.io" }), "ICP is required"),
            ("/api/generate-landing-page", json!({ "icp": icp() }), "Section is required"),
            (
                "/api/generate-landing-page",
                json!({ "icp": icp(), "section": "pricing" }),
                "Invalid section",
            ),
            ("/api/analyze-website", json!({}), "URL is required"),
        ];

        for (uri, body, message) in cases {
            let (status, text) = send(&app, "POST", uri, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let text: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(text["error"], message, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_analyze_website() {
        let app = router(ScriptedModel::new()).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/analyze-website",
            Some(json!({ "url": "https://acme.io" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["content"], "Acme builds reusable rockets");
        assert_eq!(body["metadata"]["title"], "Static page");
    }

    #[tokio::test]
    async fn test_landing_section_wraps_section_data() {
        let app = router(ScriptedModel::new().reply(
            "high-converting B2B landing pages",
            json!({ "sectionData": { "headline": "Ship faster" } }),
        ))
        .await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/generate-landing-page",
            Some(json!({ "icp": icp(), "websiteUrl": "https://x.io", "section": "problemSolution" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["sectionData"]["headline"], "Ship faster");
    }

    #[tokio::test]
    async fn test_provider_failure_is_generic_500() {
        let app = router(ScriptedModel::new().fail("value proposition strategist")).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/generate-value-prop",
            Some(json!({ "icp": icp(), "websiteUrl": "https://x.io" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("scripted failure"));
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"], "Failed to generate value proposition");
    }

    #[tokio::test]
    async fn test_chat_streams_plain_text() {
        let app = router(ScriptedModel::new().stream_chunks(&["Hello ", "there"])).await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({
                "messages": [{ "role": "user", "content": "Shorter please" }],
                "websiteUrl": "https://x.io",
                "icp": icp()
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello there");
    }
}
