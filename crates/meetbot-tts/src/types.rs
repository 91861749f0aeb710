use serde::{Deserialize, Serialize};

/// Engine-level synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub default_voice: Option<String>,
    pub language: String,
    pub engine_options: std::collections::HashMap<String, String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            default_voice: None,
            language: "en".to_string(),
            engine_options: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub language: String,
}
