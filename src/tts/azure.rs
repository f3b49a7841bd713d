//! Azure Cognitive Services speech synthesis.

use crate::config::{VoiceConfig, VoiceStyle};
use crate::error::{PipelineError, Result};
use quick_xml::escape::escape;
use tracing::instrument;

const OUTPUT_FORMAT: &str = "audio-16khz-128kbitrate-mono-mp3";

/// Neural voice for `style` in `language_code`, or `None` when no default
/// exists for that language and `voice_id` must be configured.
pub fn default_voice(language_code: &str, style: VoiceStyle) -> Option<&'static str> {
    let voices = match language_code.to_ascii_lowercase().as_str() {
        "ko-kr" => ["ko-KR-SunHiNeural", "ko-KR-InJoonNeural", "ko-KR-BongJinNeural"],
        "en-us" => ["en-US-JennyNeural", "en-US-GuyNeural", "en-US-DavisNeural"],
        "ja-jp" => ["ja-JP-NanamiNeural", "ja-JP-KeitaNeural", "ja-JP-DaichiNeural"],
        _ => return None,
    };
    Some(match style {
        VoiceStyle::Professional => voices[0],
        VoiceStyle::Friendly => voices[1],
        VoiceStyle::Energetic => voices[2],
    })
}

/// SSML document for one chunk. `text` is XML-escaped.
pub fn build_ssml(text: &str, language_code: &str, voice_name: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{body}</voice></speak>",
        lang = escape(language_code),
        voice = escape(voice_name),
        body = escape(text),
    )
}

#[derive(Debug, Clone)]
pub struct AzureTtsClient {
    http: reqwest::Client,
    api_key: String,
    region: String,
    language_code: String,
}

impl AzureTtsClient {
    pub fn new(http: reqwest::Client, api_key: String, region: String, language_code: String) -> Self {
        Self {
            http,
            api_key,
            region,
            language_code,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", self.region)
    }

    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count(), region = %self.region))]
    pub async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        let voice_name = voice
            .voice_id
            .as_deref()
            .or_else(|| default_voice(&self.language_code, voice.style))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "no default Azure voice for {}; set tts.voice.voice_id",
                    self.language_code
                ))
            })?;
        let ssml = build_ssml(text, &self.language_code, voice_name);
        let response = self
            .http
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .body(ssml)
            .send()
            .await?;
        let bytes = PipelineError::check("Azure TTS", response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_escapes_markup() {
        let ssml = build_ssml("R&D <up> 5% \"now\"", "ko-KR", "ko-KR-SunHiNeural");
        assert!(ssml.contains("R&amp;D &lt;up&gt; 5% &quot;now&quot;"));
        assert!(ssml.starts_with("<speak version='1.0' xml:lang='ko-KR'>"));
        assert!(ssml.contains("name='ko-KR-SunHiNeural'"));
        assert!(ssml.ends_with("</voice></speak>"));
    }

    #[test]
    fn test_voice_mapping() {
        assert_eq!(default_voice("ko-KR", VoiceStyle::Professional), Some("ko-KR-SunHiNeural"));
        assert_eq!(default_voice("ko-KR", VoiceStyle::Friendly), Some("ko-KR-InJoonNeural"));
        assert_eq!(default_voice("ko-KR", VoiceStyle::Energetic), Some("ko-KR-BongJinNeural"));
    }

    #[test]
    fn test_voice_follows_language() {
        assert_eq!(default_voice("en-US", VoiceStyle::Professional), Some("en-US-JennyNeural"));
        assert_eq!(default_voice("ja-jp", VoiceStyle::Energetic), Some("ja-JP-DaichiNeural"));
        assert_eq!(default_voice("fr-FR", VoiceStyle::Friendly), None);
    }

    #[tokio::test]
    async fn test_unknown_language_without_voice_id_fails_before_request() {
        let client = AzureTtsClient::new(reqwest::Client::new(), "k".into(), "westeurope".into(), "fr-FR".into());
        let err = client.synthesize("Bonjour", &VoiceConfig::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_endpoint_uses_region() {
        let client = AzureTtsClient::new(reqwest::Client::new(), "k".into(), "koreacentral".into(), "ko-KR".into());
        assert_eq!(
            client.endpoint(),
            "https://koreacentral.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }
}
