//! Wire types for the Ollama `/api/chat` endpoint.
//!
//! Responses are read leniently: only `message.content` matters, and a
//! missing or non-string content field reads as empty text.

use serde::Serialize;
use serde_json::Value;

use super::types::PromptMessage;
use crate::config::GenerationConfig;

/// Request body for Ollama `/api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub options: ChatOptions,
    /// `"json"` asks the backend for structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub stream: bool,
    /// Reasoning traces are always disabled.
    pub think: bool,
}

/// Sampling options.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    /// Output-token cap.
    pub num_predict: u32,
    pub seed: i64,
}

impl ChatRequest {
    pub fn new(config: &GenerationConfig, messages: Vec<PromptMessage>) -> Self {
        Self {
            model: config.model.clone(),
            messages,
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
                seed: config.seed,
            },
            format: config.json_format.then(|| "json".to_string()),
            stream: false,
            think: false,
        }
    }
}

/// Pull `message.content` out of a chat response body.
pub fn chat_response_content(body: &Value) -> String {
    body.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::justification::types::Role;
    use serde_json::json;
    use std::time::Duration;

    fn config(json_format: bool) -> GenerationConfig {
        GenerationConfig {
            base_url: "http://localhost:11434".into(),
            model: "qwen3:8b".into(),
            temperature: 0.2,
            seed: 42,
            max_tokens: 600,
            timeout: Duration::from_secs(600),
            retries: 2,
            json_format,
        }
    }

    #[test]
    fn request_serializes_full_payload() {
        let messages = vec![
            PromptMessage { role: Role::System, content: "sys".into() },
            PromptMessage { role: Role::User, content: "usr".into() },
        ];
        let body = serde_json::to_value(ChatRequest::new(&config(true), messages)).unwrap();

        assert_eq!(body["model"], "qwen3:8b");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "usr"}));
        assert_eq!(body["options"]["num_predict"], 600);
        assert_eq!(body["options"]["seed"], 42);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["think"], false);
    }

    #[test]
    fn format_omitted_without_hint() {
        let body = serde_json::to_value(ChatRequest::new(&config(false), vec![])).unwrap();
        assert!(body.get("format").is_none());
    }

    #[test]
    fn content_extracted_from_message() {
        let body = json!({"model": "m", "message": {"role": "assistant", "content": "{\"a\":1}"}, "done": true});
        assert_eq!(chat_response_content(&body), "{\"a\":1}");
    }

    #[test]
    fn missing_or_non_string_content_reads_empty() {
        assert_eq!(chat_response_content(&json!({})), "");
        assert_eq!(chat_response_content(&json!({"message": null})), "");
        assert_eq!(chat_response_content(&json!({"message": {"content": 5}})), "");
    }

    #[test]
    fn content_not_trimmed() {
        let body = json!({"message": {"content": "  padded \n"}});
        assert_eq!(chat_response_content(&body), "  padded \n");
    }
}
