//! The inbound chat-completion request (spec §3, §6).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::Identity;
use super::message::Message;

/// Sentinel model identifier meaning "let the policy engine pick".
pub const AUTO_MODEL: &str = "auto";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<Message>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tools: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<String>,
}

fn default_model() -> String {
    AUTO_MODEL.to_string()
}

impl ChatCompletionRequest {
    pub fn is_auto(&self) -> bool {
        self.model == AUTO_MODEL
    }

    /// Concatenated user-authored content, used by the PreAnalyzer and the
    /// heuristic classifier fallback.
    pub fn user_content(&self) -> String {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, super::message::Role::User))
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn all_content(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A request plus everything resolved before pipeline entry: identity,
/// a generated request id, and the raw idempotency key header if present.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub request_id: Uuid,
    pub identity: Identity,
    pub idempotency_key: Option<String>,
    pub body: ChatCompletionRequest,
}

impl IncomingRequest {
    pub fn new(identity: Identity, body: ChatCompletionRequest) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            identity,
            idempotency_key: None,
            body,
        }
    }
}
