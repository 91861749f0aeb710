use thiserror::Error;

/// Transient vendor failure. The controller drops the affected utterance
/// and logs rather than retrying, unless explicitly configured otherwise.
#[derive(Debug, Error)]
#[error("STT engine unavailable: {0}")]
pub struct SttUnavailable(pub String);
