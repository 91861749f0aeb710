use thiserror::Error;

/// Taxonomy of errors that cross component boundaries in the speech pipeline.
///
/// `SpeechInterrupted` is a control-flow signal rather than a fault: it is
/// the expected outcome of `speak_text` under barge-in and is never logged
/// at error level.
#[derive(Error, Debug)]
pub enum MeetbotError {
    #[error("speech interrupted after \"{spoken_text}...\"")]
    SpeechInterrupted { spoken_text: String },

    #[error("meeting provider does not support this capability: {0}")]
    ProviderNotSupported(String),

    #[error(transparent)]
    IncompatibleAudioFormat(#[from] IncompatibleAudioFormat),

    #[error("component used before it was started: {0}")]
    ComponentNotStarted(&'static str),

    #[error("vendor error from {component}: {source}")]
    VendorTransient {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("fatal pipeline error: {0}")]
    Fatal(String),

    #[error("speech failed: {0}")]
    SpeechFailed(#[source] anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MeetbotError {
    /// True if this error is the structured barge-in signal, not a fault.
    pub fn is_speech_interrupted(&self) -> bool {
        matches!(self, MeetbotError::SpeechInterrupted { .. })
    }
}

#[derive(Error, Debug)]
#[error("sample rate mismatch: reader is {reader_hz} Hz, detector expects {expected_hz} Hz")]
pub struct IncompatibleAudioFormat {
    pub reader_hz: u32,
    pub expected_hz: u32,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid configuration value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),
}

pub type MeetbotResult<T> = Result<T, MeetbotError>;
