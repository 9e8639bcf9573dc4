use crate::backend::EndpointClient;
use crate::error::Result;
use crate::logging::RequestLogger;
use crate::translate::openai_types::{ChatCompletionRequest, OutputEvent};
use crate::translate::request::to_invocation;
use crate::translate::response::endpoint_to_openai;
use crate::translate::streaming::{FrameOutcome, Reframer};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::fmt::Display;
use std::pin::Pin;

/// Caller-facing event stream for one streaming request.
pub type EventStream = Pin<Box<dyn Stream<Item = OutputEvent> + Send>>;

/// Forward a non-streaming request and return the response with its `model`
/// replaced by the endpoint name.
pub async fn proxy_non_streaming(
    req: &ChatCompletionRequest,
    endpoint: &EndpointClient,
    logger: &RequestLogger,
) -> Result<serde_json::Value> {
    let payload = to_invocation(req);

    logger.info(
        "proxy",
        format!(
            "Invoking endpoint={} messages={} max_tokens={}",
            endpoint.endpoint_name(),
            payload.messages.len(),
            payload.max_tokens
        ),
    );

    let body = endpoint.invoke(&payload).await?;
    logger.debug("proxy", format!("Response body_len={}", body.len()));

    endpoint_to_openai(&body, endpoint.endpoint_name())
}

/// Forward a streaming request, returning the reframed event stream once the
/// endpoint has accepted the call.
pub async fn proxy_streaming(
    req: &ChatCompletionRequest,
    endpoint: &EndpointClient,
    logger: &RequestLogger,
) -> Result<EventStream> {
    let payload = to_invocation(req);

    logger.info(
        "proxy",
        format!(
            "Invoking endpoint={} messages={} max_tokens={} (streaming)",
            endpoint.endpoint_name(),
            payload.messages.len(),
            payload.max_tokens
        ),
    );

    let byte_stream = endpoint.invoke_stream(&payload).await?;
    Ok(Box::pin(reframe_stream(byte_stream, logger.clone())))
}

/// Run a raw body stream through a [`Reframer`], yielding one event per
/// non-empty frame. A transport error ends the stream; whatever partial frame
/// was buffered at that point is discarded.
pub fn reframe_stream<S, E>(
    byte_stream: S,
    logger: RequestLogger,
) -> impl Stream<Item = OutputEvent> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut reframer = Reframer::new();
        let mut emitted = 0usize;

        tokio::pin!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    logger.error("stream", format!("Byte stream error: {}", e));
                    break;
                }
            };

            for outcome in reframer.extract(&chunk) {
                match outcome {
                    FrameOutcome::Content(content) => {
                        emitted += 1;
                        yield OutputEvent::new(content);
                    }
                    FrameOutcome::Empty => {}
                    FrameOutcome::Malformed => {
                        logger.debug("stream", "Skipping unparseable frame");
                    }
                }
            }
        }

        let frames = reframer.frames();
        let malformed = reframer.malformed();
        let dropped = reframer.finish();
        if dropped > 0 {
            logger.debug("stream", format!("Dropped {} trailing bytes at stream end", dropped));
        }

        logger.info(
            "stream",
            format!(
                "Stream completed: frames={} events={} malformed={}",
                frames, emitted, malformed
            ),
        );
    }
}
