use serde::{Deserialize, Serialize};

/// Who produced a segment: the remote participant being transcribed, or
/// the bot itself speaking synthesized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Assistant,
}

/// A finalized, immutable piece of text with timing and role. Created by
/// STT (participant) or the speech controller (assistant); never modified
/// after it is appended to a `Transcript`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub speaker: Option<String>,
    pub role: Role,
}

impl TranscriptSegment {
    pub fn new(
        text: impl Into<String>,
        start: f64,
        end: f64,
        speaker: Option<String>,
        role: Role,
    ) -> Self {
        let text = text.into();
        debug_assert!(!text.is_empty(), "segment text must be non-empty");
        debug_assert!(end >= start, "segment end must be >= start");
        Self {
            text,
            start,
            end,
            speaker,
            role,
        }
    }
}
