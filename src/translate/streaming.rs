//! Incremental reframing of an endpoint's streaming body into caller events.
//!
//! The endpoint emits `data: <JSON>\n\n` frames, but the transport chunks the
//! body arbitrarily: a chunk may hold several frames, or end in the middle of
//! one (or in the middle of a UTF-8 sequence). [`Reframer`] keeps the unconsumed
//! bytes between chunks and only ever hands out complete frames.
//!
//! Usage:
//!   let mut reframer = Reframer::new();
//!   for chunk in body_chunks {
//!       for event in reframer.push(&chunk) {
//!           // send `event.to_sse_frame()` to the caller
//!       }
//!   }
//!   let dropped = reframer.finish();

use super::openai_types::{BackendChunk, OutputEvent};

const FRAME_PREFIX: &[u8] = b"data:";
const FRAME_TERMINATOR: &[u8] = b"\n\n";

/// Result of interpreting one complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// `choices[0].delta.content` was present and non-empty.
    Content(String),
    /// Valid JSON without content (role-only deltas, usage frames, ...).
    Empty,
    /// The body was not valid JSON of the expected shape, e.g. `[DONE]`.
    Malformed,
}

impl FrameOutcome {
    pub fn into_event(self) -> Option<OutputEvent> {
        match self {
            Self::Content(content) => Some(OutputEvent::new(content)),
            Self::Empty | Self::Malformed => None,
        }
    }
}

/// Interpret a frame body (the bytes between the prefix and the terminator).
pub fn parse_frame(body: &[u8]) -> FrameOutcome {
    let body = trim_ascii_whitespace(body);
    if body.is_empty() {
        return FrameOutcome::Malformed;
    }

    match serde_json::from_slice::<BackendChunk>(body) {
        Ok(chunk) => match chunk.content() {
            Some(content) if !content.is_empty() => FrameOutcome::Content(content.to_string()),
            _ => FrameOutcome::Empty,
        },
        Err(_) => FrameOutcome::Malformed,
    }
}

/// Where the previous pass stopped on an unterminated frame, so the next pass
/// doesn't rescan its body for a terminator.
#[derive(Debug, Clone, Copy)]
struct PartialFrame {
    start: usize,
    search_from: usize,
}

/// Per-stream frame extractor. Owned by exactly one response stream.
#[derive(Debug, Default)]
pub struct Reframer {
    buffer: Vec<u8>,
    partial: Option<PartialFrame>,
    frames: u64,
    malformed: u64,
}

impl Reframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the caller events for every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<OutputEvent> {
        self.extract(chunk)
            .into_iter()
            .filter_map(FrameOutcome::into_event)
            .collect()
    }

    /// Append a chunk and return the outcome of every frame it completed, in
    /// stream order.
    pub fn extract(&mut self, chunk: &[u8]) -> Vec<FrameOutcome> {
        self.buffer.extend_from_slice(chunk);

        let mut outcomes = Vec::new();
        let mut cursor = 0;
        let mut consumed = 0;
        let mut resume = self.partial.take();

        while let Some(start) = find_frame_start(&self.buffer, cursor) {
            let body_start = start + FRAME_PREFIX.len();
            let search_from = match resume.take() {
                Some(partial) if partial.start == start => partial.search_from.max(body_start),
                _ => body_start,
            };

            let Some(end) = find(&self.buffer, FRAME_TERMINATOR, search_from) else {
                // The terminator may straddle this chunk and the next one.
                self.partial = Some(PartialFrame {
                    start,
                    search_from: self.buffer.len().saturating_sub(FRAME_TERMINATOR.len() - 1),
                });
                break;
            };

            let outcome = parse_frame(&self.buffer[body_start..end]);
            self.frames += 1;
            if outcome == FrameOutcome::Malformed {
                self.malformed += 1;
            }
            outcomes.push(outcome);

            cursor = end + FRAME_TERMINATOR.len();
            consumed = cursor;
        }

        if consumed > 0 {
            self.buffer.drain(..consumed);
            if let Some(ref mut partial) = self.partial {
                partial.start -= consumed;
                partial.search_from -= consumed;
            }
        }

        outcomes
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of complete frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of complete frames that could not be parsed.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// End the stream. Unterminated trailing bytes are dropped without an
    /// event; the number of dropped bytes is returned.
    pub fn finish(self) -> usize {
        self.buffer.len()
    }
}

/// Next occurrence of the frame prefix at the start of a line, at or after `from`.
fn find_frame_start(buf: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(found) = find(buf, FRAME_PREFIX, pos) {
        if found == 0 || buf[found - 1] == b'\n' {
            return Some(found);
        }
        pos = found + 1;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    fn contents(events: &[OutputEvent]) -> Vec<&str> {
        events.iter().map(|e| e.content.as_str()).collect()
    }

    fn feed_all(chunks: &[&[u8]]) -> Vec<OutputEvent> {
        let mut reframer = Reframer::new();
        chunks.iter().flat_map(|c| reframer.push(c)).collect()
    }

    #[test]
    fn test_frame_split_mid_json() {
        let first: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"He";
        let second: &[u8] = b"llo\"}}]}\n\n";
        let events = feed_all(&[first, second]);
        assert_eq!(contents(&events), vec!["Hello"]);
    }

    #[test]
    fn test_many_frames_in_one_chunk_keep_order() {
        let body = format!("{}{}{}", frame("one"), frame("two"), frame("three"));
        let events = feed_all(&[body.as_bytes()]);
        assert_eq!(contents(&events), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_every_split_point_gives_same_events() {
        let body = format!(
            "{}{}data: not json\n\n{}{}",
            frame("Hello"),
            frame(""),
            frame(", wörld 👋"),
            frame("!")
        );
        let bytes = body.as_bytes();
        let expected = feed_all(&[bytes]);
        assert_eq!(contents(&expected), vec!["Hello", ", wörld 👋", "!"]);

        for i in 0..=bytes.len() {
            let (a, b) = bytes.split_at(i);
            assert_eq!(feed_all(&[a, b]), expected, "split at {i}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let body = format!("{}{}", frame("a"), frame("b"));
        let chunks: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
        assert_eq!(contents(&feed_all(&chunks)), vec!["a", "b"]);
    }

    #[test]
    fn test_terminator_split_across_chunks() {
        let mut reframer = Reframer::new();
        let f = frame("x");
        let (head, tail) = f.as_bytes().split_at(f.len() - 1);

        assert!(reframer.push(head).is_empty());
        assert_eq!(contents(&reframer.push(tail)), vec!["x"]);
        assert!(reframer.pending().is_empty());
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut reframer = Reframer::new();
        let body = format!("data: {{\"choices\": [\n\n{}", frame("after"));
        let outcomes = reframer.extract(body.as_bytes());

        assert_eq!(
            outcomes,
            vec![FrameOutcome::Malformed, FrameOutcome::Content("after".to_string())]
        );
        assert_eq!(reframer.frames(), 2);
        assert_eq!(reframer.malformed(), 1);
        assert!(reframer.pending().is_empty());
    }

    #[test]
    fn test_malformed_frame_parsed_only_once() {
        let mut reframer = Reframer::new();
        assert_eq!(reframer.extract(b"data: {oops}\n\n"), vec![FrameOutcome::Malformed]);
        assert!(reframer.extract(frame("next").as_bytes()).len() == 1);
        assert_eq!(reframer.malformed(), 1);
    }

    #[test]
    fn test_empty_and_absent_content_suppressed() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n\n",
            "data: {\"choices\":[]}\n\n",
            "data: {\"usage\":{\"total_tokens\":9}}\n\n",
        );
        let mut reframer = Reframer::new();
        let outcomes = reframer.extract(body.as_bytes());
        assert_eq!(outcomes, vec![FrameOutcome::Empty; 5]);
        assert!(reframer.pending().is_empty());
    }

    #[test]
    fn test_done_sentinel_yields_nothing() {
        let body = format!("{}data: [DONE]\n\n", frame("last"));
        assert_eq!(contents(&feed_all(&[body.as_bytes()])), vec!["last"]);
    }

    #[test]
    fn test_trailing_partial_frame_dropped() {
        let mut reframer = Reframer::new();
        let tail: &[u8] = b"data: {\"choices\":[{\"del";
        let body = [frame("kept").as_bytes(), tail].concat();

        assert_eq!(contents(&reframer.push(&body)), vec!["kept"]);
        assert_eq!(reframer.pending(), tail);
        assert_eq!(reframer.finish(), tail.len());
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let body = format!(
            ": keep-alive\n\nevent: delta\n{}id: 7\n{}",
            frame("a"),
            frame("b")
        );
        assert_eq!(contents(&feed_all(&[body.as_bytes()])), vec!["a", "b"]);
    }

    #[test]
    fn test_prefix_must_start_a_line() {
        let body = format!("xdata: {{}}\n\n{}", frame("real"));
        assert_eq!(contents(&feed_all(&[body.as_bytes()])), vec!["real"]);
    }

    #[test]
    fn test_prefix_without_space() {
        let body: &[u8] = b"data:{\"choices\":[{\"delta\":{\"content\":\"tight\"}}]}\n\n";
        assert_eq!(contents(&feed_all(&[body])), vec!["tight"]);
    }

    #[test]
    fn test_partial_frame_survives_many_chunks() {
        let f = frame("slow");
        let mut reframer = Reframer::new();
        let mut events = Vec::new();
        for piece in f.as_bytes().chunks(3) {
            events.extend(reframer.push(piece));
        }
        assert_eq!(contents(&events), vec!["slow"]);
        assert_eq!(reframer.frames(), 1);
    }

    #[test]
    fn test_parse_frame_outcomes() {
        assert_eq!(
            parse_frame(b" {\"choices\":[{\"delta\":{\"content\":\"x\"}}]} "),
            FrameOutcome::Content("x".to_string())
        );
        assert_eq!(parse_frame(b"{}"), FrameOutcome::Empty);
        assert_eq!(parse_frame(b""), FrameOutcome::Malformed);
        assert_eq!(parse_frame(b"[DONE]"), FrameOutcome::Malformed);
        assert_eq!(parse_frame(b"{\"choices\":\"nope\"}"), FrameOutcome::Malformed);
    }
}
