//! Text-to-speech synthesis.
//!
//! # Supported providers
//!
//! | Provider | Module | Endpoint |
//! |----------|--------|----------|
//! | ElevenLabs | [`elevenlabs`] | `POST /v1/text-to-speech/{voice_id}` |
//! | Google Cloud TTS | [`google`] | `POST /v1/text:synthesize` |
//! | Azure Speech | [`azure`] | SSML to `/cognitiveservices/v1` |
//! | Mock | this module | writes a placeholder file |
//!
//! Long scripts are split on sentence boundaries into chunks no longer than
//! the configured limit; each chunk is synthesized in turn and the MP3
//! segments are concatenated into a single file. There is no fallback
//! between providers: a failing chunk fails the whole stage.

pub mod azure;
pub mod elevenlabs;
pub mod google;

use crate::config::{TtsConfig, TtsProvider, VoiceConfig, resolve_api_key};
use crate::error::{PipelineError, Result};
use crate::models::AudioArtifact;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Narration speed used for duration estimates.
const CHARS_PER_MINUTE: u64 = 150;

/// One configured provider backend.
#[derive(Debug, Clone)]
pub enum SpeechBackend {
    ElevenLabs(elevenlabs::ElevenLabsClient),
    Google(google::GoogleTtsClient),
    Azure(azure::AzureTtsClient),
    Mock,
}

/// Turns script text into an audio file under the audio directory.
#[derive(Debug, Clone)]
pub struct SpeechSynthesizer {
    backend: SpeechBackend,
    provider: TtsProvider,
    voice: VoiceConfig,
    audio_dir: PathBuf,
    max_chunk_chars: usize,
}

impl SpeechSynthesizer {
    pub fn from_config(config: &TtsConfig, audio_dir: PathBuf) -> Result<Self> {
        let provider = config.provider;
        let backend = if provider == TtsProvider::Mock {
            SpeechBackend::Mock
        } else {
            let api_key = resolve_api_key(config.api_key.as_deref(), "TTS_API_KEY", provider.env_var()).ok_or(
                PipelineError::MissingApiKey {
                    provider: provider.name(),
                    env_var: provider.env_var(),
                },
            )?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?;
            match provider {
                TtsProvider::Elevenlabs => SpeechBackend::ElevenLabs(elevenlabs::ElevenLabsClient::new(http, api_key)),
                TtsProvider::Google => {
                    SpeechBackend::Google(google::GoogleTtsClient::new(http, api_key, config.language_code.clone()))
                }
                TtsProvider::Azure => SpeechBackend::Azure(azure::AzureTtsClient::new(
                    http,
                    api_key,
                    config.azure_region.clone(),
                    config.language_code.clone(),
                )),
                TtsProvider::Mock => SpeechBackend::Mock,
            }
        };
        Ok(Self {
            backend,
            provider,
            voice: config.voice.clone(),
            audio_dir,
            max_chunk_chars: config.max_chunk_chars,
        })
    }

    pub fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Where the audio for `stem` is written.
    pub fn audio_path(&self, stem: &str) -> PathBuf {
        self.audio_dir.join(format!("{stem}.mp3"))
    }

    /// Synthesize `text` and write it to `<audio_dir>/<stem>.mp3`.
    ///
    /// Real providers receive the text in chunks of at most
    /// `max_chunk_chars` characters; the returned MP3 segments are
    /// concatenated in order.
    ///
    /// # Arguments
    ///
    /// * `text` - Narration to speak
    /// * `stem` - File name without extension, shared with the script and video
    ///
    /// # Returns
    ///
    /// The written [`AudioArtifact`] with its estimated duration.
    ///
    /// # Errors
    ///
    /// Empty text, an unwritable audio directory, or the first chunk the
    /// provider rejects. No partial file is written in that case.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let audio = synthesizer.synthesize(&package.script.narration(), "20250506_070000_01_chips").await?;
    /// assert!(audio.file_path.ends_with("20250506_070000_01_chips.mp3"));
    /// ```
    #[instrument(level = "info", skip_all, fields(provider = self.provider.name(), %stem))]
    pub async fn synthesize(&self, text: &str, stem: &str) -> Result<AudioArtifact> {
        if text.trim().is_empty() {
            return Err(PipelineError::Config("cannot synthesize empty text".to_string()));
        }
        fs::create_dir_all(&self.audio_dir).await?;
        let path = self.audio_path(stem);

        let audio = match &self.backend {
            SpeechBackend::Mock => mock_audio(text),
            backend => {
                let chunks = split_text_for_tts(text, self.max_chunk_chars);
                let mut audio = Vec::new();
                for (i, chunk) in chunks.iter().enumerate() {
                    debug!(chunk = i + 1, of = chunks.len(), chars = chunk.chars().count(), "Synthesizing chunk");
                    let bytes = match backend {
                        SpeechBackend::ElevenLabs(c) => c.synthesize(chunk, &self.voice).await?,
                        SpeechBackend::Google(c) => c.synthesize(chunk, &self.voice).await?,
                        SpeechBackend::Azure(c) => c.synthesize(chunk, &self.voice).await?,
                        SpeechBackend::Mock => mock_audio(chunk),
                    };
                    audio.extend_from_slice(&bytes);
                }
                audio
            }
        };

        write_audio(&path, &audio).await?;
        let artifact = AudioArtifact {
            file_path: path,
            duration_secs: estimate_duration_secs(text),
            bytes: audio.len() as u64,
            provider: self.provider,
            voice_config: self.voice.clone(),
        };
        info!(
            path = %artifact.file_path.display(),
            bytes = artifact.bytes,
            duration_secs = artifact.duration_secs,
            "Wrote audio"
        );
        Ok(artifact)
    }
}

async fn write_audio(path: &Path, audio: &[u8]) -> Result<()> {
    if audio.is_empty() {
        return Err(PipelineError::MalformedResponse {
            provider: "TTS".to_string(),
            reason: "provider returned no audio".to_string(),
        });
    }
    fs::write(path, audio).await?;
    Ok(())
}

/// Placeholder content written by the mock provider.
fn mock_audio(text: &str) -> Vec<u8> {
    let preview: String = text.chars().take(100).collect();
    format!(
        "[Mock Audio File]\nText: {preview}...\nCharacters: {}\nEstimated duration: {}s\n",
        text.chars().count(),
        estimate_duration_secs(text)
    )
    .into_bytes()
}

/// Spoken length at 150 characters per minute.
pub fn estimate_duration_secs(text: &str) -> u64 {
    text.chars().count() as u64 * 60 / CHARS_PER_MINUTE
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Sentences (ending in `.`, `!`, `?` or `。`) are kept whole where possible;
/// a single sentence longer than the limit is hard-split on characters.
///
/// # Arguments
///
/// * `text` - Text to split; runs of whitespace collapse to one space
/// * `max_chars` - Upper bound per chunk, in characters (0 is treated as 1)
///
/// # Returns
///
/// Non-empty chunks in reading order.
///
/// # Examples
///
/// ```ignore
/// let text = "One two. Three four! Five six? Seven.";
/// assert_eq!(split_text_for_tts(text, 100), vec![text]);
/// ```
pub fn split_text_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in normalized.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '。') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0;
    for sentence in sentences.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let len = sentence.chars().count();
        let sep = usize::from(chunk_len > 0);
        if chunk_len + sep + len <= max_chars {
            if sep == 1 {
                chunk.push(' ');
            }
            chunk.push_str(sentence);
            chunk_len += sep + len;
            continue;
        }
        if chunk_len > 0 {
            chunks.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }
        if len <= max_chars {
            chunk.push_str(sentence);
            chunk_len = len;
        } else {
            let chars: Vec<char> = sentence.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if chunk_len > 0 {
        chunks.push(chunk);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_synth(dir: &Path) -> SpeechSynthesizer {
        SpeechSynthesizer::from_config(&TtsConfig::default(), dir.join("audio")).unwrap()
    }

    #[tokio::test]
    async fn test_mock_writes_non_empty_file_at_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        let synth = mock_synth(dir.path());
        let artifact = synth
            .synthesize("Hello everyone. Today we look at chips.", "20250506_070809_01_chips")
            .await
            .unwrap();

        let expected = dir.path().join("audio/20250506_070809_01_chips.mp3");
        assert_eq!(artifact.file_path, expected);
        let meta = std::fs::metadata(&expected).unwrap();
        assert!(meta.len() > 0);
        assert_eq!(artifact.bytes, meta.len());
        assert_eq!(artifact.provider, TtsProvider::Mock);
        assert_eq!(artifact.voice_config, VoiceConfig::default());
    }

    #[tokio::test]
    async fn test_mock_output_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let synth = mock_synth(dir.path());
        let a = synth.synthesize("Same text.", "a").await.unwrap();
        let b = synth.synthesize("Same text.", "b").await.unwrap();
        assert_eq!(
            std::fs::read(&a.file_path).unwrap(),
            std::fs::read(&b.file_path).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let synth = mock_synth(dir.path());
        assert!(synth.synthesize("   ", "empty").await.is_err());
    }

    #[test]
    fn test_missing_key_for_real_provider() {
        if std::env::var("TTS_API_KEY").is_ok() || std::env::var("ELEVENLABS_API_KEY").is_ok() {
            return;
        }
        let config = TtsConfig {
            provider: TtsProvider::Elevenlabs,
            ..TtsConfig::default()
        };
        let err = SpeechSynthesizer::from_config(&config, PathBuf::from("audio")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingApiKey { env_var: "ELEVENLABS_API_KEY", .. }));
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration_secs(&"가".repeat(150)), 60);
        assert_eq!(estimate_duration_secs(""), 0);
        assert_eq!(estimate_duration_secs(&"a".repeat(300)), 120);
    }

    #[test]
    fn test_split_keeps_sentences_together() {
        let text = "One two. Three four! Five six? Seven.";
        assert_eq!(split_text_for_tts(text, 100), vec!["One two. Three four! Five six? Seven."]);
        assert_eq!(
            split_text_for_tts(text, 20),
            vec!["One two. Three four!", "Five six? Seven."]
        );
    }

    #[test]
    fn test_split_hard_splits_long_sentence() {
        let chunks = split_text_for_tts(&"a".repeat(25), 10);
        assert_eq!(chunks, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn test_split_respects_limit_in_characters() {
        let text = "삼성전자가 투자를 결정했습니다. 주가가 올랐습니다. 전문가들은 신중합니다.";
        for chunk in split_text_for_tts(text, 18) {
            assert!(chunk.chars().count() <= 18, "chunk too long: {chunk}");
        }
        let rejoined = split_text_for_tts(text, 18).join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_split_trailing_text_without_terminator() {
        assert_eq!(split_text_for_tts("Done. and more", 100), vec!["Done. and more"]);
    }
}
