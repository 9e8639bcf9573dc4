//! Translation between the caller's OpenAI-style format and the inference
//! endpoint's format.
//!
//! Requests are validated and reshaped into invocation payloads, single
//! responses get their `model` rewritten, and streamed bodies are reframed
//! into `{"content": ...}` events. All functions here are pure (no I/O).

pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
