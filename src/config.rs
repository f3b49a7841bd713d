//! Runtime configuration.
//!
//! Options come from three layers, lowest priority first:
//! 1. Built-in defaults (every field has one, an empty file is valid)
//! 2. A YAML file, `automation.yaml` by default
//! 3. Command-line flags (see [`crate::cli`])
//!
//! API keys set in neither layer are read from the environment by
//! [`resolve_api_key`].
//!
//! ```yaml
//! keywords: ["삼성", "쿠팡", "부동산", "AI"]
//! target_videos_per_day: 3
//! ai:
//!   provider: gemini
//! tts:
//!   provider: elevenlabs
//!   voice: { style: professional, stability: 0.5, similarity_boost: 0.75 }
//! upload:
//!   provider: youtube
//!   auto_upload: true
//! ```

use crate::error::{PipelineError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Language-model vendor used by the script generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Openai,
    Gemini,
    Anthropic,
    #[default]
    Mock,
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::Openai => "OpenAI",
            AiProvider::Gemini => "Gemini",
            AiProvider::Anthropic => "Anthropic",
            AiProvider::Mock => "Mock",
        }
    }

    /// Provider-specific environment variable consulted when no key is configured.
    pub fn env_var(&self) -> &'static str {
        match self {
            AiProvider::Openai => "OPENAI_API_KEY",
            AiProvider::Gemini => "GEMINI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
            AiProvider::Mock => "AI_API_KEY",
        }
    }
}

/// Text-to-speech vendor used by the speech synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Elevenlabs,
    Google,
    Azure,
    #[default]
    Mock,
}

impl TtsProvider {
    pub fn name(&self) -> &'static str {
        match self {
            TtsProvider::Elevenlabs => "ElevenLabs",
            TtsProvider::Google => "Google TTS",
            TtsProvider::Azure => "Azure TTS",
            TtsProvider::Mock => "Mock",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            TtsProvider::Elevenlabs => "ELEVENLABS_API_KEY",
            TtsProvider::Google => "GOOGLE_TTS_API_KEY",
            TtsProvider::Azure => "AZURE_SPEECH_KEY",
            TtsProvider::Mock => "TTS_API_KEY",
        }
    }
}

/// Video-hosting backend used by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UploadProvider {
    Youtube,
    #[default]
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NewsSource {
    #[serde(rename = "google_news")]
    #[value(name = "google_news")]
    GoogleNews,
    Naver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    #[default]
    Professional,
    Friendly,
    Energetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Private => "private",
        }
    }
}

/// Top-level configuration for one automation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutomationConfig {
    pub keywords: Vec<String>,
    pub target_videos_per_day: usize,
    pub output_dir: PathBuf,
    pub news: NewsConfig,
    pub ai: AiConfig,
    pub tts: TtsConfig,
    pub upload: UploadConfig,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            keywords: ["삼성", "현대", "쿠팡", "부동산", "손흥민", "AI"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            target_videos_per_day: 3,
            output_dir: PathBuf::from("output"),
            news: NewsConfig::default(),
            ai: AiConfig::default(),
            tts: TtsConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NewsConfig {
    pub sources: Vec<NewsSource>,
    /// Maximum items kept per keyword and source.
    pub max_per_keyword: usize,
    pub min_relevance: f64,
    /// `hl` parameter for Google News.
    pub language: String,
    /// `gl` parameter for Google News.
    pub region: String,
    /// Scrape the article body for each collected item.
    pub fetch_content: bool,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sources: vec![NewsSource::GoogleNews],
            max_per_keyword: 10,
            min_relevance: 0.5,
            language: "ko".to_string(),
            region: "KR".to_string(),
            fetch_content: false,
            naver_client_id: None,
            naver_client_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub thumbnail_title_count: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::Mock,
            api_key: None,
            model: None,
            temperature: 0.7,
            max_tokens: 2000,
            thumbnail_title_count: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    pub api_key: Option<String>,
    pub voice: VoiceConfig,
    pub language_code: String,
    pub azure_region: String,
    /// Longest text sent to the provider in one request.
    pub max_chunk_chars: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::Mock,
            api_key: None,
            voice: VoiceConfig::default(),
            language_code: "ko-KR".to_string(),
            azure_region: "koreacentral".to_string(),
            max_chunk_chars: 5000,
        }
    }
}

/// Voice parameters. `stability` and `similarity_boost` are ElevenLabs
/// settings in `0.0..=1.0`; the style picks a voice on every provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub style: VoiceStyle,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style_exaggeration: f32,
    pub speaker_boost: bool,
    pub voice_id: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            style: VoiceStyle::Professional,
            stability: 0.5,
            similarity_boost: 0.75,
            style_exaggeration: 0.5,
            speaker_boost: true,
            voice_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub provider: UploadProvider,
    pub auto_upload: bool,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    /// 25 = News & Politics.
    pub category_id: String,
    pub privacy_status: PrivacyStatus,
    /// Allow the browser consent flow when no usable token is stored.
    pub interactive_auth: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            provider: UploadProvider::Mock,
            auto_upload: false,
            credentials_file: PathBuf::from("client_secrets.json"),
            token_file: PathBuf::from("youtube_token.json"),
            category_id: "25".to_string(),
            privacy_status: PrivacyStatus::Public,
            interactive_auth: true,
        }
    }
}

impl AutomationConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file is not an error when `required` is false; the defaults
    /// are returned instead.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                return Err(PipelineError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            info!("No config file found; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(
            keywords = config.keywords.len(),
            ai = config.ai.provider.name(),
            tts = config.tts.provider.name(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(PipelineError::Config("at least one keyword is required".into()));
        }
        if self.tts.max_chunk_chars == 0 {
            return Err(PipelineError::Config("tts.max_chunk_chars must be positive".into()));
        }
        for (name, value) in [
            ("stability", self.tts.voice.stability),
            ("similarity_boost", self.tts.voice.similarity_boost),
            ("style_exaggeration", self.tts.voice.style_exaggeration),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Config(format!(
                    "tts.voice.{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if self.tts.provider == TtsProvider::Azure
            && self.tts.voice.voice_id.is_none()
            && crate::tts::azure::default_voice(&self.tts.language_code, self.tts.voice.style).is_none()
        {
            return Err(PipelineError::Config(format!(
                "no default Azure voice for tts.language_code {}; set tts.voice.voice_id",
                self.tts.language_code
            )));
        }
        Ok(())
    }
}

/// Resolve an API key from the config value, then the generic variable, then
/// the provider-specific variable.
pub fn resolve_api_key(configured: Option<&str>, generic_env: &str, provider_env: &str) -> Option<String> {
    let non_blank = |k: &String| !k.trim().is_empty();
    configured
        .map(str::to_string)
        .filter(non_blank)
        .or_else(|| std::env::var(generic_env).ok().filter(non_blank))
        .or_else(|| std::env::var(provider_env).ok().filter(non_blank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = AutomationConfig::from_yaml("").unwrap();
        assert_eq!(config, AutomationConfig::default());
        assert_eq!(config.ai.provider, AiProvider::Mock);
        assert_eq!(config.tts.provider, TtsProvider::Mock);
        assert_eq!(config.target_videos_per_day, 3);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
keywords: ["semiconductor", "housing"]
target_videos_per_day: 5
ai:
  provider: anthropic
tts:
  provider: elevenlabs
  voice:
    style: energetic
    stability: 0.3
news:
  sources: [google_news, naver]
upload:
  provider: youtube
  privacy_status: unlisted
"#;
        let config = AutomationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.keywords, vec!["semiconductor", "housing"]);
        assert_eq!(config.target_videos_per_day, 5);
        assert_eq!(config.ai.provider, AiProvider::Anthropic);
        assert_eq!(config.ai.max_tokens, 2000);
        assert_eq!(config.tts.provider, TtsProvider::Elevenlabs);
        assert_eq!(config.tts.voice.style, VoiceStyle::Energetic);
        assert_eq!(config.tts.voice.stability, 0.3);
        assert_eq!(config.tts.voice.similarity_boost, 0.75);
        assert_eq!(config.news.sources, vec![NewsSource::GoogleNews, NewsSource::Naver]);
        assert_eq!(config.upload.provider, UploadProvider::Youtube);
        assert_eq!(config.upload.privacy_status, PrivacyStatus::Unlisted);
        assert_eq!(config.upload.category_id, "25");
    }

    #[test]
    fn test_rejects_out_of_range_voice_setting() {
        let yaml = "tts:\n  voice:\n    similarity_boost: 1.5\n";
        let err = AutomationConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("similarity_boost"));
    }

    #[test]
    fn test_azure_language_needs_voice_or_default() {
        let yaml = "tts:\n  provider: azure\n  language_code: fr-FR\n";
        assert!(matches!(AutomationConfig::from_yaml(yaml), Err(PipelineError::Config(_))));

        let yaml = "tts:\n  provider: azure\n  language_code: fr-FR\n  voice:\n    voice_id: fr-FR-DeniseNeural\n";
        assert!(AutomationConfig::from_yaml(yaml).is_ok());

        let yaml = "tts:\n  provider: azure\n  language_code: en-US\n";
        assert!(AutomationConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_rejects_empty_keywords() {
        let err = AutomationConfig::from_yaml("keywords: []\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_unknown_provider_is_yaml_error() {
        let err = AutomationConfig::from_yaml("ai:\n  provider: llama\n").unwrap_err();
        assert!(matches!(err, PipelineError::Yaml(_)));
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutomationConfig::load(&dir.path().join("nope.yaml"), false).unwrap();
        assert_eq!(config, AutomationConfig::default());
        assert!(AutomationConfig::load(&dir.path().join("nope.yaml"), true).is_err());
    }

    #[test]
    fn test_configured_key_wins() {
        let key = resolve_api_key(Some("sk-config"), "NEWS_SHORTS_TEST_UNSET_A", "NEWS_SHORTS_TEST_UNSET_B");
        assert_eq!(key.as_deref(), Some("sk-config"));
        assert_eq!(
            resolve_api_key(None, "NEWS_SHORTS_TEST_UNSET_A", "NEWS_SHORTS_TEST_UNSET_B"),
            None
        );
        assert_eq!(resolve_api_key(Some("  "), "NEWS_SHORTS_TEST_UNSET_A", "NEWS_SHORTS_TEST_UNSET_B"), None);
    }
}
