use super::lenient_string;
use super::openai_types::{ChatCompletionRequest, ChatMessage};
use crate::config::RelayConfig;
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /translate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslateRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target: Option<String>,
}

pub fn system_instruction(target: &str) -> String {
    format!("Translate to {}. Preserve meaning, names and tone.", target)
}

/// Build the chat completion that performs the translation. A missing text
/// translates the empty string; a missing target uses the configured default.
pub fn build_chat_request(req: &TranslateRequest, config: &RelayConfig) -> ChatCompletionRequest {
    let target = req
        .target
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&config.translation.default_target);

    ChatCompletionRequest {
        model: config.models.translate.clone(),
        messages: vec![
            ChatMessage::system(system_instruction(target)),
            ChatMessage::user(req.text.clone().unwrap_or_default()),
        ],
    }
}

/// `choices[0].message`, or `{}` when any step of that path is missing or null.
pub fn first_message(resp: &Value) -> Value {
    resp.pointer("/choices/0/message")
        .filter(|m| !m.is_null())
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}
