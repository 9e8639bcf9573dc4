use super::openai_types::{ChatCompletionRequest, InvocationPayload};
use crate::error::{GatewayError, Result};

pub const DEFAULT_MAX_TOKENS: u64 = 1024;
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

/// Parse and validate an inbound request body.
pub fn parse_request(body: &[u8]) -> Result<ChatCompletionRequest> {
    let req: ChatCompletionRequest = serde_json::from_slice(body)
        .map_err(|e| GatewayError::invalid_request(format!("Invalid request body: {e}")))?;
    validate(&req)?;
    Ok(req)
}

pub fn validate(req: &ChatCompletionRequest) -> Result<()> {
    if req.messages.is_empty() {
        return Err(GatewayError::invalid_request("'messages' must not be empty"));
    }
    if req.max_tokens == Some(0) {
        return Err(GatewayError::invalid_request(
            "'max_tokens' must be a positive integer",
        ));
    }
    if let Some(t) = req.temperature {
        if !TEMPERATURE_RANGE.contains(&t) {
            return Err(GatewayError::invalid_request(format!(
                "'temperature' must be between 0 and 2, got {t}"
            )));
        }
    }
    Ok(())
}

/// Build the endpoint invocation body for a validated request.
pub fn to_invocation(req: &ChatCompletionRequest) -> InvocationPayload {
    InvocationPayload {
        messages: req.messages.clone(),
        max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream: req.stream,
        temperature: req.temperature,
    }
}
