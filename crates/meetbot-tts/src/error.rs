use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("TTS engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("voice not found: {0}")]
    VoiceNotFound(String),

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
}

pub type TtsResult<T> = Result<T, TtsError>;
