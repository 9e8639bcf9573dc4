//! Type definitions for the caller-facing [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)
//! subset the gateway accepts, plus the envelopes it sends back.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Accepted for client compatibility; the configured endpoint decides the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Backend payload
// ---------------------------------------------------------------------------

/// Body sent to the inference endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationPayload {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

// ---------------------------------------------------------------------------
// Streaming output
// ---------------------------------------------------------------------------

/// One content fragment delivered to the caller as `data: {"content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub content: String,
}

impl OutputEvent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// JSON body of the event's `data:` line.
    pub fn data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// The event encoded as a complete text/event-stream frame.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.data())
    }
}

/// Shape of the backend's streaming frames, only as deep as the gateway reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChunk {
    #[serde(default)]
    pub choices: Vec<BackendChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendChunkChoice {
    #[serde(default)]
    pub delta: Option<BackendDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl BackendChunk {
    /// `choices[0].delta.content`, absent if any step is missing.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.as_ref())
            .and_then(|d| d.content.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("authentication_error", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"gpt-4o","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!(!req.stream);
        assert_eq!(req.max_tokens, None);
        assert_eq!(req.messages[0].role, Role::User);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_str::<ChatCompletionRequest>(
            r#"{"messages":[{"role":"wizard","content":"hi"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_content_path() {
        let chunk: BackendChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.content(), Some("Hi"));

        let no_delta: BackendChunk = serde_json::from_str(r#"{"choices":[{}]}"#).unwrap();
        assert_eq!(no_delta.content(), None);

        let no_choices: BackendChunk = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(no_choices.content(), None);
    }

    #[test]
    fn test_output_event_frame() {
        let frame = OutputEvent::new("He said \"hi\"").to_sse_frame();
        assert_eq!(frame, "data: {\"content\":\"He said \\\"hi\\\"\"}\n\n");
    }

    #[test]
    fn test_output_event_data_is_frame_body() {
        let event = OutputEvent::new("x\ny");
        assert_eq!(event.data(), r#"{"content":"x\ny"}"#);
        assert_eq!(event.to_sse_frame(), format!("data: {}\n\n", event.data()));
    }
}
