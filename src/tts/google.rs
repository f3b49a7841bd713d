//! Google Cloud Text-to-Speech (API-key authenticated REST endpoint).

use crate::config::{VoiceConfig, VoiceStyle};
use crate::error::{PipelineError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

const GOOGLE_TTS_API: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

/// `(voice name, ssml gender)` for a style.
pub fn voice_for(language_code: &str, style: VoiceStyle) -> (String, &'static str) {
    let (variant, gender) = match style {
        VoiceStyle::Professional => ("A", "FEMALE"),
        VoiceStyle::Friendly => ("B", "FEMALE"),
        VoiceStyle::Energetic => ("C", "MALE"),
    };
    (format!("{language_code}-Standard-{variant}"), gender)
}

#[derive(Debug, Clone)]
pub struct GoogleTtsClient {
    http: reqwest::Client,
    api_key: String,
    language_code: String,
}

impl GoogleTtsClient {
    pub fn new(http: reqwest::Client, api_key: String, language_code: String) -> Self {
        Self {
            http,
            api_key,
            language_code,
        }
    }

    pub fn request_body(&self, text: &str, voice: &VoiceConfig) -> Value {
        let (default_name, gender) = voice_for(&self.language_code, voice.style);
        let name = voice.voice_id.clone().unwrap_or(default_name);
        json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.language_code,
                "name": name,
                "ssmlGender": gender,
            },
            "audioConfig": { "audioEncoding": "MP3" }
        })
    }

    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    pub async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(GOOGLE_TTS_API)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(text, voice))
            .send()
            .await?;
        let raw = PipelineError::check("Google TTS", response).await?.text().await?;
        decode_audio(&raw)
    }
}

/// Pull the base64 `audioContent` out of a synthesize response.
pub fn decode_audio(raw: &str) -> Result<Vec<u8>> {
    let parsed: SynthesizeResponse = serde_json::from_str(raw)?;
    let content = parsed.audio_content.ok_or_else(|| PipelineError::MalformedResponse {
        provider: "Google TTS".to_string(),
        reason: "missing audioContent".to_string(),
    })?;
    STANDARD
        .decode(content.as_bytes())
        .map_err(|e| PipelineError::MalformedResponse {
            provider: "Google TTS".to_string(),
            reason: format!("audioContent is not base64: {e}"),
        })
}
