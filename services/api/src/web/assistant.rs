//! services/api/src/web/assistant.rs
//!
//! The symptom assistant chat endpoint. The client keeps the conversation and
//! sends it back with each new message.

use axum::{extract::State, http::StatusCode, Json};
use doctor_finder_core::assistant::{suggest_specialty, FAILURE_REPLY, NOT_CONFIGURED_REPLY};
use doctor_finder_core::domain::{ChatMessage, ChatRole};
use doctor_finder_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::web::errors::HandlerError;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ChatTurnRole {
    User,
    Assistant,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: ChatTurnRole,
    pub text: String,
}

impl From<ChatTurn> for ChatMessage {
    fn from(turn: ChatTurn) -> Self {
        let role = match turn.role {
            ChatTurnRole::User => ChatRole::User,
            ChatTurnRole::Assistant => ChatRole::Assistant,
        };
        ChatMessage {
            role,
            content: turn.text,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    /// A known specialty named in the reply, if any.
    pub suggested_specialty: Option<String>,
}

/// Ask the assistant which specialist fits the described symptoms.
///
/// Model failures are answered with a canned reply rather than an error status.
#[utoipa::path(
    post,
    path = "/assistant/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatResponse),
        (status = 400, description = "Empty message")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message cannot be empty".to_string()));
    }

    let history: Vec<ChatMessage> = req.history.into_iter().map(ChatMessage::from).collect();
    let reply = match state.assistant.reply(&history, message).await {
        Ok(reply) => reply,
        Err(PortError::Unavailable(msg)) => {
            warn!("Assistant unavailable: {}", msg);
            NOT_CONFIGURED_REPLY.to_string()
        }
        Err(e) => {
            error!("Assistant request failed: {}", e);
            FAILURE_REPLY.to_string()
        }
    };

    let suggested_specialty = suggest_specialty(&reply).map(str::to_string);
    Ok(Json(ChatResponse {
        reply,
        suggested_specialty,
    }))
}
