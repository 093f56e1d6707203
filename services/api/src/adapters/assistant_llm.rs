//! services/api/src/adapters/assistant_llm.rs
//!
//! This module contains the adapter for the symptom assistant LLM.
//! It implements the `SymptomAssistantService` port from the `core` crate.

const MEDICAL_ASSISTANT_PROMPT: &str = r#"You are a medical AI assistant that ONLY helps with medical questions and recommends which type of doctor to consult.

Your role:
1. If the question is medical-related: Provide a VERY SHORT analysis (1-2 sentences) and recommend the appropriate specialist doctor
2. If the question is NOT medical-related or confusing: Politely say "I can only assist with medical specialist recommendations. Please describe your health symptoms or concerns."

Important rules:
- Keep responses VERY SHORT and concise (under 100 words)
- Focus ONLY on doctor type recommendation
- Choose the specialist from: {specialties}
- No detailed medical advice or diagnosis
- Always remind to consult a real doctor
- If confused or non-medical: Say you only help with medical specialist recommendations"#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use doctor_finder_core::assistant::{context_window, EMPTY_REPLY, SPECIALTIES};
use doctor_finder_core::domain::{ChatMessage, ChatRole};
use doctor_finder_core::ports::{PortError, PortResult, SymptomAssistantService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SymptomAssistantService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAssistantAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAssistantAdapter {
    /// Creates a new `OpenAiAssistantAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn system_prompt() -> String {
        MEDICAL_ASSISTANT_PROMPT.replace("{specialties}", &SPECIALTIES.join(", "))
    }

    fn to_request_message(message: &ChatMessage) -> PortResult<ChatCompletionRequestMessage> {
        let built: ChatCompletionRequestMessage = match message.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        };
        Ok(built)
    }
}

//=========================================================================================
// `SymptomAssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SymptomAssistantService for OpenAiAssistantAdapter {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(Self::system_prompt())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];
        for turn in context_window(history) {
            messages.push(Self::to_request_message(turn)?);
        }
        messages.push(Self::to_request_message(&ChatMessage {
            role: ChatRole::User,
            content: message.to_string(),
        })?);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .max_completion_tokens(150u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        Ok(reply)
    }
}

/// Stands in for the LLM when no API key is configured.
#[derive(Clone, Default)]
pub struct UnconfiguredAssistant;

#[async_trait]
impl SymptomAssistantService for UnconfiguredAssistant {
    async fn reply(&self, _history: &[ChatMessage], _message: &str) -> PortResult<String> {
        Err(PortError::Unavailable(
            "OPENAI_API_KEY is not set".to_string(),
        ))
    }
}
