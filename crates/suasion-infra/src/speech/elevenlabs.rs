//! ElevenLabs text-to-speech client.
//!
//! Synthesizes the opening line of an assistant turn. Audio delivery is the
//! deployment surface's concern; this client performs the synthesis request
//! and reads the response body to completion. Callers fire and forget.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use suasion_core::speech::SpeechSynthesizer;
use suasion_types::config::SpeechConfig;
use suasion_types::error::SpeechError;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const MODEL_ID: &str = "eleven_multilingual_v2";

/// TTS client against the ElevenLabs API.
pub struct ElevenLabsSpeech {
    client: Client,
    base_url: String,
    voice_id: String,
    api_key: SecretString,
}

impl ElevenLabsSpeech {
    /// Build a client from the speech configuration.
    ///
    /// Fails with [`SpeechError::Disabled`] when speech is not enabled.
    pub fn new(config: &SpeechConfig, api_key: SecretString) -> Result<Self, SpeechError> {
        if !config.enabled {
            return Err(SpeechError::Disabled);
        }

        Ok(Self {
            client: Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            voice_id: config
                .voice_id
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl SpeechSynthesizer for ElevenLabsSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&SynthesisRequest {
                text,
                model_id: MODEL_ID,
            })
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechError::Http(format!(
                "speech endpoint returned {}",
                response.status()
            )));
        }

        // Drain the audio body; playback happens at the UI layer.
        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        debug!(bytes = audio.len(), "synthesized first-line audio");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_is_rejected() {
        let config = SpeechConfig::default();
        let result = ElevenLabsSpeech::new(&config, SecretString::from("key"));
        assert!(matches!(result, Err(SpeechError::Disabled)));
    }

    #[test]
    fn test_defaults_applied() {
        let config = SpeechConfig {
            enabled: true,
            base_url: None,
            voice_id: None,
        };
        let speech = ElevenLabsSpeech::new(&config, SecretString::from("key")).unwrap();
        assert_eq!(speech.base_url, DEFAULT_BASE_URL);
        assert_eq!(speech.voice_id, DEFAULT_VOICE_ID);
    }

    #[test]
    fn test_custom_voice_and_base() {
        let config = SpeechConfig {
            enabled: true,
            base_url: Some("https://tts.example.com/".to_string()),
            voice_id: Some("custom-voice".to_string()),
        };
        let speech = ElevenLabsSpeech::new(&config, SecretString::from("key")).unwrap();
        assert_eq!(speech.base_url, "https://tts.example.com");
        assert_eq!(speech.voice_id, "custom-voice");
    }
}
