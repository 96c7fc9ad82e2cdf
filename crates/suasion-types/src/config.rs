//! Study configuration for Suasion.
//!
//! Deserialized from `config.toml` by suasion-infra. Every field has a
//! default so a missing or partial file still yields a runnable setup.

use serde::{Deserialize, Serialize};

/// Top-level study configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Model identifier for assistant turns.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Speak the opening line of each assistant turn.
    #[serde(default)]
    pub auto_speak_first_line: bool,

    /// Generate follow-up suggestions after eligible turns.
    #[serde(default = "default_true")]
    pub follow_up_suggestions: bool,

    /// Derive a conversation title from the first exchange.
    #[serde(default = "default_true")]
    pub auto_title: bool,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            auto_speak_first_line: false,
            follow_up_suggestions: true,
            auto_title: true,
            retrieval: RetrievalConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Context-retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Named assistant/index on the retrieval service.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_snippet_size")]
    pub snippet_size: u32,

    /// Snippets scoring below this are discarded.
    #[serde(default)]
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            assistant_name: default_assistant_name(),
            top_k: default_top_k(),
            snippet_size: default_snippet_size(),
            min_score: 0.0,
        }
    }
}

/// Speech-synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub voice_id: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            voice_id: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_assistant_name() -> String {
    "conversation-search-assistant".to_string()
}

fn default_top_k() -> u32 {
    10
}

fn default_snippet_size() -> u32 {
    1280
}
