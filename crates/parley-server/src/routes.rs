use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use parley::{GenerateOptions, Reply};
use parley_common::Message;

use crate::error::Result;
use crate::state::AppState;

/// Body of `POST /chat`. Omitted fields fall back to the `[chat]` settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatBody {
    pub prompt: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub max_tool_iterations: Option<u32>,
    #[serde(default)]
    pub response_schema: Option<Value>,
    /// Merged over the configured params.
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: Reply,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tools: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Message>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/chat", post(chat))
        .route("/memory/{thread_id}", get(memory).delete(reset_memory))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tools: state.tools().tool_names().join(","),
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>> {
    let defaults = &state.defaults;
    let thread_id = body
        .thread_id
        .unwrap_or_else(|| defaults.default_thread.clone());

    let mut params = defaults.params.clone();
    params.extend(body.params.unwrap_or_default());

    let options = GenerateOptions {
        enabled_tools: body
            .tools
            .unwrap_or_else(|| defaults.enabled_tools.clone()),
        max_tool_iterations: body
            .max_tool_iterations
            .unwrap_or(defaults.max_tool_iterations),
        response_schema: body.response_schema,
        params,
    };

    let reply = state.core.generate(&thread_id, &body.prompt, &options).await?;

    if let Some(max) = defaults.max_history {
        state.core.truncate(&thread_id, max).await?;
    }

    info!(thread_id = %thread_id, exhausted = reply.is_exhausted(), "Chat turn completed");
    Ok(Json(ChatReply { reply }))
}

async fn memory(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<HistoryResponse>> {
    let history = state.core.history(&thread_id).await?;
    Ok(Json(HistoryResponse { history }))
}

async fn reset_memory(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<StatusCode> {
    state.core.reset(&thread_id).await?;
    info!(thread_id = %thread_id, "Thread reset");
    Ok(StatusCode::NO_CONTENT)
}
