//! ElevenLabs text-to-speech.

use crate::config::{VoiceConfig, VoiceStyle};
use crate::error::{PipelineError, Result};
use serde_json::{Value, json};
use tracing::{debug, instrument};

const ELEVENLABS_API: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const MODEL_ID: &str = "eleven_multilingual_v2";

/// Stock voice used for each style unless `voice_id` overrides it.
pub fn default_voice_id(style: VoiceStyle) -> &'static str {
    match style {
        VoiceStyle::Professional => "21m00Tcm4TlvDq8ikWAM", // Rachel
        VoiceStyle::Friendly => "AZnzlk1XvdvUeBnXmlld",     // Domi
        VoiceStyle::Energetic => "TxGEqnHWrfWFTfGW9XjX",    // Josh
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: ELEVENLABS_API.to_string(),
        }
    }

    pub fn request_body(text: &str, voice: &VoiceConfig) -> Value {
        json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": {
                "stability": voice.stability,
                "similarity_boost": voice.similarity_boost,
                "style": voice.style_exaggeration,
                "use_speaker_boost": voice.speaker_boost,
            }
        })
    }

    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    pub async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        let voice_id = voice
            .voice_id
            .as_deref()
            .unwrap_or_else(|| default_voice_id(voice.style));
        let url = format!("{}/{voice_id}", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&Self::request_body(text, voice))
            .send()
            .await?;
        let bytes = PipelineError::check("ElevenLabs", response).await?.bytes().await?;
        debug!(bytes = bytes.len(), "Received audio");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_mapping() {
        assert_eq!(default_voice_id(VoiceStyle::Professional), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(default_voice_id(VoiceStyle::Friendly), "AZnzlk1XvdvUeBnXmlld");
        assert_eq!(default_voice_id(VoiceStyle::Energetic), "TxGEqnHWrfWFTfGW9XjX");
    }

    #[test]
    fn test_request_body_carries_voice_settings() {
        let voice = VoiceConfig {
            stability: 0.25,
            speaker_boost: false,
            ..VoiceConfig::default()
        };
        let body = ElevenLabsClient::request_body("안녕하세요", &voice);
        assert_eq!(body["text"], "안녕하세요");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["stability"], 0.25);
        assert_eq!(body["voice_settings"]["similarity_boost"], 0.75);
        assert_eq!(body["voice_settings"]["use_speaker_boost"], false);
    }
}
