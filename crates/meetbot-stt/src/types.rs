/// One piece of finalized text the engine produced for the utterance it
/// was streamed. `start`/`end` are relative offsets in seconds *within the
/// utterance*; the transcription controller translates them to absolute
/// session time using the utterance's leading window.
#[derive(Debug, Clone, PartialEq)]
pub struct SttSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl SttSegment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}
