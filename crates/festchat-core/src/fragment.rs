//! Decoding of transport fragments and sub-chunk splitting.
//!
//! The backend pushes raw SSE payloads that may be JSON-wrapped in a few
//! known shapes, a bare string, or plain text. Decoding is best-effort:
//! a payload that is not valid JSON is surfaced as literal text, never as
//! an error.

use serde_json::Value;

/// Reserved payload signaling "no more fragments for this message".
pub const DONE_SENTINEL: &str = "[DONE]";

/// Result of decoding one raw transport fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFragment {
    /// Logical end-of-stream sentinel.
    Done,
    /// Text extracted from a structured payload.
    Text(String),
    /// Payload was not valid JSON; carried through as literal text.
    /// Distinct from `Text` so callers can log the fallback.
    Raw(String),
    /// Nothing displayable in this fragment.
    Empty,
}

impl DecodedFragment {
    /// Displayable text of this fragment, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Raw(s) => Some(s),
            Self::Done | Self::Empty => None,
        }
    }
}

/// Decode a raw fragment payload into displayable text.
///
/// Known JSON shapes, probed in order:
/// - Gemini: `{ candidates: [ { content: { parts: [ { text } ] } } ] }`
/// - bare JSON string
/// - `{ text }`
/// - `{ delta: { content } }`
/// - `{ content }` (string)
/// - otherwise the first non-empty string property
pub fn decode_fragment(raw: &str) -> DecodedFragment {
    if raw.is_empty() {
        return DecodedFragment::Empty;
    }
    if raw == DONE_SENTINEL {
        return DecodedFragment::Done;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => match extract_text(&value) {
            Some(text) if !text.is_empty() => DecodedFragment::Text(text),
            _ => DecodedFragment::Empty,
        },
        // Not structured data: treat the payload as literal text.
        Err(_) => DecodedFragment::Raw(raw.to_owned()),
    }
}

fn extract_text(value: &Value) -> Option<String> {
    if let Some(candidates) = value.get("candidates").and_then(Value::as_array) {
        if let Some(parts) = candidates
            .first()
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
        {
            let joined: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            return Some(joined);
        }
    }

    if let Some(s) = value.as_str() {
        return Some(s.to_owned());
    }
    if let Some(s) = value.get("text").and_then(Value::as_str) {
        return Some(s.to_owned());
    }
    if let Some(s) = value
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
    {
        return Some(s.to_owned());
    }
    if let Some(s) = value.get("content").and_then(Value::as_str) {
        return Some(s.to_owned());
    }

    // Fallback: first non-empty string property.
    if let Some(map) = value.as_object() {
        for v in map.values() {
            if let Some(s) = v.as_str() {
                if !s.trim().is_empty() {
                    return Some(s.to_owned());
                }
            }
        }
    }

    None
}

/// Split text into sub-chunks of at most `max_chars` Unicode scalar
/// values each, preserving order. Concatenating the result reproduces
/// the input exactly.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
