//! Conversation wizard endpoints. Every step returns the updated snapshot.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::info;

use crate::conversation::{ContentChoice, Conversation, EmailType, FunnelChoice};
use crate::memory::ConversationId;

use super::errors::{ApiError, ApiResult};
use super::state::AppState;

fn conversation_id(raw: &str) -> ApiResult<ConversationId> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid conversation id: {raw}")))
}

/// Parse a required choice field.
fn parse_choice<T: std::str::FromStr>(value: Option<String>, field: &str) -> ApiResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))?
        .parse()
        .map_err(|e: T::Err| ApiError::BadRequest(e.to_string()))
}

pub(super) async fn create(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conversation = state.conversations.create_conversation().await;
    (StatusCode::CREATED, Json(conversation))
}

pub(super) async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    Ok(Json(state.conversations.snapshot(id)?))
}

pub(super) async fn clear(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = conversation_id(&id)?;
    state.conversations.clear_conversation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Free-text message.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageRequest {
    /// Message text.
    pub text: Option<String>,
}

pub(super) async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Text is required"))?;
    Ok(Json(state.conversations.send_message(id, &text).await?))
}

/// ICP selection.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectIcpRequest {
    /// Id of one of the offered profiles.
    pub icp_id: Option<String>,
}

pub(super) async fn select_icp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SelectIcpRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let icp_id = request
        .icp_id
        .ok_or_else(|| ApiError::bad_request("ICP is required"))?;
    Ok(Json(state.conversations.select_icp(id, &icp_id).await?))
}

pub(super) async fn funnel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    Ok(Json(state.conversations.generate_funnel(id).await?))
}

pub(super) async fn regenerate_funnel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    Ok(Json(state.conversations.regenerate_funnel_summary(id)?))
}

/// Choice made on a picker card.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChoiceRequest {
    /// Chosen option name.
    pub choice: Option<String>,
}

pub(super) async fn funnel_choice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ChoiceRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let choice: FunnelChoice = parse_choice(request.choice, "Choice")?;
    Ok(Json(state.conversations.funnel_choice(id, choice)?))
}

pub(super) async fn content_choice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ChoiceRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let choice: ContentChoice = parse_choice(request.choice, "Choice")?;
    Ok(Json(state.conversations.content_choice(id, choice).await?))
}

/// Email type choice.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailTypeRequest {
    /// `one-time` or `sequence`.
    #[serde(rename = "type")]
    pub email_type: Option<String>,
}

pub(super) async fn email_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EmailTypeRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let email_type: EmailType = parse_choice(request.email_type, "Type")?;
    Ok(Json(state.conversations.email_type_choice(id, email_type).await?))
}

/// Sequence length choice.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SequenceLengthRequest {
    /// Number of emails.
    pub days: Option<u8>,
}

pub(super) async fn sequence_length(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SequenceLengthRequest>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let id = conversation_id(&id)?;
    let Json(request) = payload?;
    let days = request
        .days
        .ok_or_else(|| ApiError::bad_request("Days is required"))?;
    Ok(Json(state.conversations.sequence_length_choice(id, days).await?))
}

pub(super) async fn memory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = conversation_id(&id)?;
    let exported = state.conversations.memory_export(id)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], exported))
}

pub(super) async fn clear_generation_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    let generations = state.conversations.generations();
    info!("Clearing {} cached generations", generations.cached_len());
    generations.clear_cache();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use crate::llm::scripted::ScriptedModel;
    use crate::server::routes::tests::{router, send};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    fn model() -> ScriptedModel {
        ScriptedModel::new()
            .reply(
                "Ideal Customer Profiles",
                json!({ "icps": [{ "id": "founders", "title": "Seed-stage Founders" }] }),
            )
            .reply(
                "value proposition strategist",
                json!({ "variations": [{ "id": "v1", "text": "Launch in days" }] }),
            )
    }

    async fn create(app: &axum::Router) -> String {
        let (status, body) = send(app, "POST", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let body: Value = serde_json::from_str(&body).unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_wizard_over_http() {
        let app = router(model()).await;
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "text": "https://acme.io" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["phase"], "icp-selection");
        assert_eq!(body["messages"][2]["component"], "icps");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/conversations/{id}/select-icp"),
            Some(json!({ "icpId": "founders" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", &format!("/api/conversations/{id}/memory"), None).await;
        assert_eq!(status, StatusCode::OK);
        let memory: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(memory["selectedIcp"]["id"], "founders");
    }

    #[tokio::test]
    async fn test_gated_step_is_conflict() {
        let app = router(model()).await;
        let id = create(&app).await;

        let (status, body) = send(&app, "POST", &format!("/api/conversations/{id}/funnel"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_unknown_conversation_and_bad_choice() {
        let app = router(model()).await;
        let missing = crate::memory::ConversationId::new();

        let (status, _) = send(&app, "GET", &format!("/api/conversations/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/conversations/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = create(&app).await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/conversations/{id}/funnel-choice"),
            Some(json!({ "choice": "carrier-pigeon" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_conversation() {
        let app = router(model()).await;
        let id = create(&app).await;

        let (status, _) = send(&app, "DELETE", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
