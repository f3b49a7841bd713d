//! Video assembly.
//!
//! Editing is done outside this tool. The stage writes a small text manifest at
//! the video path so later stages have a concrete file; replace it with the
//! rendered video before running `upload`.

use crate::error::Result;
use crate::models::{AudioArtifact, Script};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct VideoAssembler {
    video_dir: PathBuf,
}

impl VideoAssembler {
    pub fn new(video_dir: PathBuf) -> Self {
        Self { video_dir }
    }

    pub fn video_path(&self, stem: &str) -> PathBuf {
        self.video_dir.join(format!("{stem}.mp4"))
    }

    #[instrument(level = "info", skip(self, script, audio))]
    pub async fn assemble(&self, stem: &str, title: &str, script: &Script, audio: &AudioArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.video_dir).await?;
        let path = self.video_path(stem);
        fs::write(&path, manifest(title, script, audio)).await?;
        info!(path = %path.display(), "Wrote video placeholder");
        Ok(path)
    }
}

fn manifest(title: &str, script: &Script, audio: &AudioArtifact) -> String {
    format!(
        "[Placeholder Video]\nTitle: {title}\nAudio: {}\nAudio duration: {}s\nScript characters: {}\n",
        display_name(&audio.file_path),
        audio.duration_secs,
        script.narration().chars().count(),
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TtsProvider, VoiceConfig};

    fn script() -> Script {
        Script {
            intro: "Hi.".into(),
            body: "Body text.".into(),
            conclusion: "Bye.".into(),
            thumbnail_title_candidates: vec![],
        }
    }

    fn audio() -> AudioArtifact {
        AudioArtifact {
            file_path: PathBuf::from("output/audio/clip.mp3"),
            duration_secs: 42,
            bytes: 10,
            provider: TtsProvider::Mock,
            voice_config: VoiceConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_assemble_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = VideoAssembler::new(dir.path().join("videos"));
        let path = assembler.assemble("clip", "Big news", &script(), &audio()).await.unwrap();

        assert_eq!(path, dir.path().join("videos/clip.mp4"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Title: Big news"));
        assert!(text.contains("Audio: clip.mp3"));
        assert!(text.contains("Audio duration: 42s"));
        // "Hi.\n\nBody text.\n\nBye."
        assert!(text.contains("Script characters: 21"));
    }
}
