use serde::Serialize;

/// Bridge-facing capture event.
///
/// Serializes to `{"data": [..], "size": n}` for every buffer and
/// `{"error": "..."}` once on failure. A clean stop produces no event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CaptureEvent {
    Data { data: Vec<u8>, size: usize },
    Error { error: String },
}
