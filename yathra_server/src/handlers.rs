use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "userInput")]
    pub user_input: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// The caller's network address is the conversation identity.
fn identity_of(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

pub async fn chat_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let identity = identity_of(&addr);
    let span = info_span!("chat", request_id = %Uuid::now_v7(), identity = %identity);

    async move {
        let user_input = match payload {
            Ok(Json(ChatRequest {
                user_input: Some(text),
            })) => text,
            Ok(_) => return Err(ApiError::InvalidRequest),
            Err(rejection) => {
                debug!("Rejected chat body: {rejection}");
                return Err(ApiError::InvalidRequest);
            }
        };

        info!("New chat request: {} chars", user_input.len());

        let result = state
            .conversations
            .handle_turn(&identity, &user_input)
            .await?;

        Ok(Json(ChatResponse {
            response: result.response,
        }))
    }
    .instrument(span)
    .await
}

pub async fn reset_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Json<Value> {
    let identity = identity_of(&addr);
    let reset = state.conversations.reset(&identity).await;
    info!("Reset requested by {identity}: existed={reset}");
    Json(json!({ "reset": reset }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.store().len().await;
    Json(json!({ "status": "ok", "sessions": sessions }))
}
