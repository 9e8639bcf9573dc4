use crate::error::{GatewayError, Result};
use serde_json::Value;

/// Parse a non-streaming endpoint response and stamp it with the endpoint name.
/// Pure function: the body is otherwise passed through untouched.
pub fn endpoint_to_openai(body: &[u8], endpoint_name: &str) -> Result<Value> {
    let mut response: Value = serde_json::from_slice(body)
        .map_err(|e| GatewayError::backend(format!("Endpoint returned invalid JSON: {e}")))?;

    let object = response
        .as_object_mut()
        .ok_or_else(|| GatewayError::backend("Endpoint response is not a JSON object"))?;
    object.insert("model".to_string(), Value::String(endpoint_name.to_string()));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_replaced_with_endpoint_name() {
        let body = br#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "/opt/ml/model",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;

        let out = endpoint_to_openai(body, "qwen-endpoint").unwrap();
        assert_eq!(out["model"], "qwen-endpoint");
        assert_eq!(out["choices"][0]["message"]["content"], "Hello");
        assert_eq!(out["usage"]["total_tokens"], 4);
    }

    #[test]
    fn test_model_added_when_missing() {
        let out = endpoint_to_openai(br#"{"choices":[]}"#, "ep").unwrap();
        assert_eq!(out["model"], "ep");
    }

    #[test]
    fn test_non_object_is_backend_error() {
        let err = endpoint_to_openai(b"[1,2,3]", "ep").unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(endpoint_to_openai(b"<html>", "ep").is_err());
    }
}
