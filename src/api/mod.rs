//! Wire payloads for the remote conversational-AI API.
//!
//! The remote service is treated as opaque: messages go out, content comes
//! back, optionally as a stream. These types mirror the OpenAI-compatible
//! JSON shapes the service speaks.

use serde::{Deserialize, Serialize};

pub mod client;

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// One incremental delta from a streamed response.
#[derive(Deserialize)]
pub struct StreamDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamChoice {
    pub delta: StreamDelta,
}

#[derive(Deserialize)]
pub struct StreamResponse {
    pub choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub created: Option<u64>,
    pub owned_by: Option<String>,
}

#[derive(Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub filename: Option<String>,
}

/// Sort models newest first, falling back to id for a stable listing.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| match (&a.created, &b.created) {
        (Some(a_created), Some(b_created)) => b_created.cmp(a_created),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_to_the_wire_shape() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            stream: true,
            temperature: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn stream_payload_parses_content_deltas() {
        let payload = r#"{"choices":[{"delta":{"content":"chunk"}}]}"#;
        let parsed: StreamResponse = serde_json::from_str(payload).expect("parse");
        assert_eq!(
            parsed.choices[0].delta.content.as_deref(),
            Some("chunk")
        );
    }

    #[test]
    fn models_sort_newest_first_then_by_id() {
        let mut models = vec![
            ModelInfo {
                id: "b-old".to_string(),
                created: Some(1),
                owned_by: None,
            },
            ModelInfo {
                id: "a-new".to_string(),
                created: Some(2),
                owned_by: None,
            },
            ModelInfo {
                id: "undated".to_string(),
                created: None,
                owned_by: None,
            },
        ];
        sort_models(&mut models);
        assert_eq!(models[0].id, "a-new");
        assert_eq!(models[1].id, "b-old");
        assert_eq!(models[2].id, "undated");
    }
}
