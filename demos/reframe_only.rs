//! Demonstrate the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example reframe_only`

use chat_gateway::translate::request::{parse_request, to_invocation};
use chat_gateway::translate::response::endpoint_to_openai;
use chat_gateway::translate::streaming::{FrameOutcome, Reframer};

fn main() -> anyhow::Result<()> {
    // What an OpenAI client sends
    let body = br#"{
        "model": "gpt-4o",
        "messages": [
            {"role": "system", "content": "You are a geography expert. Be concise."},
            {"role": "user", "content": "What is the capital of France?"}
        ],
        "stream": true
    }"#;

    let req = parse_request(body)?;
    let payload = to_invocation(&req);
    println!("=== Endpoint payload ===");
    println!("{}\n", serde_json::to_string_pretty(&payload)?);

    // A streamed endpoint body, chopped at awkward places
    let chunks: [&[u8]; 4] = [
        b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"choices\":[{\"de",
        b"lta\":{\"content\":\"Paris\"}}]}\n",
        b"\ndata: {\"choices\":[{\"delta\":{\"content\":\".\"}}]}\n\ndata: [DONE]\n\n",
        b"data: {\"choices\":[{\"delta\":{\"content\":\"unterminated",
    ];

    println!("=== Reframed stream ===");
    let mut reframer = Reframer::new();
    for (i, chunk) in chunks.iter().enumerate() {
        for outcome in reframer.extract(chunk) {
            match outcome {
                FrameOutcome::Content(content) => {
                    let event = chat_gateway::translate::openai_types::OutputEvent::new(content);
                    print!("chunk {i}: {}", event.to_sse_frame());
                }
                FrameOutcome::Empty => println!("chunk {i}: (empty frame)"),
                FrameOutcome::Malformed => println!("chunk {i}: (skipped frame)"),
            }
        }
    }
    println!("dropped {} trailing bytes\n", reframer.finish());

    // A non-streaming endpoint response
    let response = br#"{"id":"chatcmpl-1","model":"/opt/ml/model","choices":[{"index":0,"message":{"role":"assistant","content":"Paris."}}]}"#;
    let translated = endpoint_to_openai(response, "geo-endpoint")?;
    println!("=== Translated response ===");
    println!("{}", serde_json::to_string_pretty(&translated)?);

    Ok(())
}
