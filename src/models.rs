//! Records that flow between pipeline stages.
//!
//! - [`Article`]: a scored news item produced by the collector
//! - [`Script`] / [`VideoDetails`] / [`ScriptPackage`]: script generator output
//! - [`AudioArtifact`]: speech synthesizer output
//! - [`WorkflowResult`]: one record per processed article
//!
//! Everything here is plain data; every record serializes to the JSON files
//! under the output directory.

use crate::config::{TtsProvider, VoiceConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A news item after relevance scoring.
///
/// Built once by the collector and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    /// Source identifier: `google_news` or `naver`.
    pub source: String,
    /// Publisher name as reported by the feed, when available.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Keyword whose search produced this item.
    pub keyword: String,
    pub published_at: Option<DateTime<Utc>>,
    pub relevance_score: f64,
    /// Scraped article body, only when content fetching is enabled.
    #[serde(default)]
    pub content: Option<String>,
}

impl Article {
    /// Best available text for prompting: the body if scraped, else the feed summary.
    pub fn prompt_text(&self) -> &str {
        match self.content.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => &self.description,
        }
    }
}

/// Narration script split into its three spoken sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub intro: String,
    pub body: String,
    pub conclusion: String,
    pub thumbnail_title_candidates: Vec<String>,
}

impl Script {
    /// The text handed to the speech synthesizer.
    pub fn narration(&self) -> String {
        [&self.intro, &self.body, &self.conclusion]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn best_thumbnail_title(&self) -> Option<&str> {
        self.thumbnail_title_candidates.first().map(String::as_str)
    }
}

/// Title, description and tags proposed for the uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Script stage artifact, persisted so later stages can run separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPackage {
    pub article: Article,
    pub script: Script,
    pub details: VideoDetails,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
}

/// An audio file written by the speech synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub file_path: PathBuf,
    /// Estimated spoken length.
    pub duration_secs: u64,
    pub bytes: u64,
    pub provider: TtsProvider,
    pub voice_config: VoiceConfig,
}

/// Confirmation returned by the uploader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub video_id: String,
    pub video_url: String,
    pub title: String,
    pub privacy_status: String,
    pub publish_at: Option<DateTime<Utc>>,
}

/// A video already present on the authenticated channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadStatus {
    /// An earlier stage failed.
    NotAttempted,
    /// Auto-upload is disabled; the video waits for a manual upload.
    Skipped,
    Uploaded { video_id: String, video_url: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Script,
    Speech,
    Video,
    Upload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Script => "script",
            Stage::Speech => "speech",
            Stage::Video => "video",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Outcome of one article's run through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub article: Article,
    pub script: Option<Script>,
    pub thumbnail_title: Option<String>,
    pub audio_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
    pub upload_status: UploadStatus,
    pub status: RunStatus,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowResult {
    pub fn started(article: Article) -> Self {
        Self {
            article,
            script: None,
            thumbnail_title: None,
            audio_path: None,
            video_path: None,
            upload_status: UploadStatus::NotAttempted,
            status: RunStatus::Failed,
            failed_stage: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn fail(mut self, stage: Stage, error: impl ToString) -> Self {
        self.status = RunStatus::Failed;
        self.failed_stage = Some(stage);
        self.error = Some(error.to_string());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Envelope of `collected_news.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedNews {
    pub collected_at: DateTime<Utc>,
    pub total_count: usize,
    pub articles: Vec<Article>,
}

/// Envelope of `workflow_results_<timestamp>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_videos: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<WorkflowResult>,
}
