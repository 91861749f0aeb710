//! Session configuration: provider selectors, per-component argument maps,
//! and environment variable overrides.
//!
//! Mirrors the option surface described for the session composer: a name
//! and language, `vad`/`stt`/`tts` selector tokens paired with free-form
//! `*_args` tables, and nested controller tuning knobs. Environment
//! variables override defaults but never an explicitly supplied value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_name() -> String {
    "meetbot".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionControllerArgs {
    #[serde(default = "default_utterance_tail_seconds")]
    pub utterance_tail_seconds: f64,
    #[serde(default = "default_max_stt_tasks")]
    pub max_stt_tasks: usize,
    #[serde(default = "default_window_queue_size")]
    pub window_queue_size: usize,
}

fn default_utterance_tail_seconds() -> f64 {
    0.6
}

fn default_max_stt_tasks() -> usize {
    5
}

fn default_window_queue_size() -> usize {
    100
}

impl Default for TranscriptionControllerArgs {
    fn default() -> Self {
        Self {
            utterance_tail_seconds: default_utterance_tail_seconds(),
            max_stt_tasks: default_max_stt_tasks(),
            window_queue_size: default_window_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechControllerArgs {
    #[serde(default = "default_prefetch_chunks")]
    pub prefetch_chunks: usize,
}

fn default_prefetch_chunks() -> usize {
    2
}

impl Default for SpeechControllerArgs {
    fn default() -> Self {
        Self {
            prefetch_chunks: default_prefetch_chunks(),
        }
    }
}

/// Session-wide configuration, recognized options all optional per the
/// external interface: a bot name/language, provider selector tokens with
/// per-component argument tables, and controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub vad: Option<String>,
    #[serde(default)]
    pub stt: Option<String>,
    #[serde(default)]
    pub tts: Option<String>,
    #[serde(default)]
    pub vad_args: HashMap<String, String>,
    #[serde(default)]
    pub stt_args: HashMap<String, String>,
    #[serde(default)]
    pub tts_args: HashMap<String, String>,
    #[serde(default)]
    pub transcription_controller_args: TranscriptionControllerArgs,
    #[serde(default)]
    pub speech_controller_args: SpeechControllerArgs,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            language: default_language(),
            vad: None,
            stt: None,
            tts: None,
            vad_args: HashMap::new(),
            stt_args: HashMap::new(),
            tts_args: HashMap::new(),
            transcription_controller_args: TranscriptionControllerArgs::default(),
            speech_controller_args: SpeechControllerArgs::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from an optional TOML file, then apply
    /// `{prefix}_NAME` / `{prefix}_LANGUAGE` environment overrides. Env
    /// vars win over defaults but not over values already set by the file.
    pub fn load(path: Option<&str>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("name", default_name())?
            .set_default("language", default_language())?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let raw = builder.build()?;
        let mut parsed: Self = raw.try_deserialize().unwrap_or_default();

        if let Ok(name) = std::env::var(format!("{env_prefix}_NAME")) {
            if parsed.name == default_name() {
                parsed.name = name;
            }
        }
        if let Ok(lang) = std::env::var(format!("{env_prefix}_LANGUAGE")) {
            if parsed.language == default_language() {
                parsed.language = lang;
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.name, "meetbot");
        assert_eq!(cfg.language, "en");
        assert_eq!(cfg.transcription_controller_args.utterance_tail_seconds, 0.6);
        assert_eq!(cfg.transcription_controller_args.max_stt_tasks, 5);
        assert_eq!(cfg.speech_controller_args.prefetch_chunks, 2);
    }

    #[test]
    fn env_override_applies_when_no_explicit_config() {
        std::env::set_var("MTB_TEST_NAME", "conference-bot");
        let cfg = SessionConfig::load(None, "MTB_TEST").unwrap();
        assert_eq!(cfg.name, "conference-bot");
        std::env::remove_var("MTB_TEST_NAME");
    }
}
