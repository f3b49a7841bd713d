//! Video upload.
//!
//! [`Uploader::YouTube`] talks to the YouTube Data API v3 with OAuth
//! credentials from [`oauth`]; [`Uploader::Mock`] only checks that the file
//! exists and returns a `MOCK_<timestamp>` id.

pub mod oauth;
pub mod youtube;

use crate::config::{PrivacyStatus, UploadConfig, UploadProvider};
use crate::error::{PipelineError, Result};
use crate::models::{UploadReceipt, UploadedVideo, VideoDetails};
use crate::utils::truncate_chars;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const TITLE_LIMIT: usize = 100;
pub const DESCRIPTION_LIMIT: usize = 5000;
pub const TAG_BUDGET: usize = 500;

/// Everything YouTube needs besides the video bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: PrivacyStatus,
    pub thumbnail: Option<PathBuf>,
    /// Scheduled publish time; forces `private` until then.
    pub publish_at: Option<DateTime<Utc>>,
}

impl VideoMetadata {
    pub fn from_details(details: &VideoDetails, config: &UploadConfig) -> Self {
        Self {
            title: details.title.clone(),
            description: details.description.clone(),
            tags: details.tags.clone(),
            category_id: config.category_id.clone(),
            privacy_status: config.privacy_status,
            thumbnail: None,
            publish_at: None,
        }
    }

    pub fn effective_privacy(&self) -> PrivacyStatus {
        if self.publish_at.is_some() {
            PrivacyStatus::Private
        } else {
            self.privacy_status
        }
    }

    pub fn snippet_title(&self) -> String {
        truncate_chars(self.title.trim(), TITLE_LIMIT)
    }

    /// `snippet` + `status` resource for `videos.insert`.
    pub fn request_body(&self) -> Value {
        let mut status = json!({
            "privacyStatus": self.effective_privacy().as_str(),
            "selfDeclaredMadeForKids": false,
        });
        if let Some(at) = self.publish_at {
            status["publishAt"] = Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        json!({
            "snippet": {
                "title": self.snippet_title(),
                "description": truncate_chars(&self.description, DESCRIPTION_LIMIT),
                "tags": fit_tags(&self.tags, TAG_BUDGET),
                "categoryId": self.category_id,
            },
            "status": status,
        })
    }
}

/// Fields to overwrite on an already uploaded video; `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Snippet keys `videos.update` accepts; everything else is read-only.
const WRITABLE_SNIPPET_KEYS: [&str; 6] = [
    "title",
    "description",
    "tags",
    "categoryId",
    "defaultLanguage",
    "defaultAudioLanguage",
];

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_none()
    }

    /// Writable part of `current` with the requested fields replaced, under
    /// the same limits as an upload.
    pub fn apply_to(&self, current: &Value) -> Value {
        let mut snippet = Map::new();
        for key in WRITABLE_SNIPPET_KEYS {
            if let Some(value) = current.get(key) {
                snippet.insert(key.to_string(), value.clone());
            }
        }
        if let Some(title) = &self.title {
            snippet.insert("title".into(), json!(truncate_chars(title.trim(), TITLE_LIMIT)));
        }
        if let Some(description) = &self.description {
            snippet.insert("description".into(), json!(truncate_chars(description, DESCRIPTION_LIMIT)));
        }
        if let Some(tags) = &self.tags {
            snippet.insert("tags".into(), json!(fit_tags(tags, TAG_BUDGET)));
        }
        Value::Object(snippet)
    }
}

/// Keep tags, in order, while their combined length stays within `budget`.
///
/// YouTube counts the comma between tags and wraps tags containing spaces in
/// quotes, so both are included in the length.
pub fn fit_tags(tags: &[String], budget: usize) -> Vec<String> {
    let mut used = 0;
    let mut kept = Vec::new();
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let quoted = if tag.contains(' ') { 2 } else { 0 };
        let cost = tag.chars().count() + quoted + usize::from(!kept.is_empty());
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(tag.to_string());
    }
    kept
}

#[derive(Debug, Clone)]
pub enum Uploader {
    YouTube(youtube::YouTubeClient),
    Mock,
}

impl Uploader {
    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        match config.provider {
            UploadProvider::Mock => Ok(Uploader::Mock),
            UploadProvider::Youtube => {
                let http = reqwest::Client::builder().build()?;
                let auth = oauth::Authenticator::new(
                    http.clone(),
                    config.credentials_file.clone(),
                    config.token_file.clone(),
                    config.interactive_auth,
                );
                Ok(Uploader::YouTube(youtube::YouTubeClient::new(http, auth)))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Uploader::YouTube(_) => "YouTube",
            Uploader::Mock => "Mock",
        }
    }

    pub async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> Result<UploadReceipt> {
        match self {
            Uploader::YouTube(client) => client.upload(video, metadata).await,
            Uploader::Mock => mock_upload(video, metadata).await,
        }
    }

    pub async fn list_recent_uploads(&self, max_results: u32) -> Result<Vec<UploadedVideo>> {
        match self {
            Uploader::YouTube(client) => client.list_recent_uploads(max_results).await,
            Uploader::Mock => Ok(Vec::new()),
        }
    }

    /// Overwrite title, description and/or tags of an uploaded video.
    ///
    /// Fields left as `None` keep their current value. An update with no
    /// fields at all is rejected before anything is sent.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] for an empty update, and for an unknown
    /// video id on YouTube; HTTP and auth failures as for [`Uploader::upload`].
    pub async fn update_video(&self, video_id: &str, update: &MetadataUpdate) -> Result<UploadedVideo> {
        if update.is_empty() {
            return Err(PipelineError::Config(
                "nothing to update: give a title, description or tags".to_string(),
            ));
        }
        match self {
            Uploader::YouTube(client) => client.update_video(video_id, update).await,
            Uploader::Mock => Ok(mock_update(video_id, update)),
        }
    }
}

fn mock_update(video_id: &str, update: &MetadataUpdate) -> UploadedVideo {
    let snippet = update.apply_to(&Value::Null);
    let text = |key: &str| snippet.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    info!(%video_id, fields = ?snippet.as_object().map(|m| m.keys().cloned().collect::<Vec<_>>()), "Simulated metadata update");
    UploadedVideo {
        video_id: video_id.to_string(),
        title: text("title"),
        description: truncate_chars(&text("description"), 100),
        published_at: String::new(),
        url: youtube::watch_url(video_id),
    }
}

#[instrument(level = "info", skip(metadata), fields(path = %video.display()))]
async fn mock_upload(video: &Path, metadata: &VideoMetadata) -> Result<UploadReceipt> {
    if !fs::try_exists(video).await? {
        return Err(PipelineError::Config(format!("video file not found: {}", video.display())));
    }
    let video_id = format!("MOCK_{}", Utc::now().format("%Y%m%d%H%M%S"));
    let video_url = youtube::watch_url(&video_id);
    info!(%video_id, title = %metadata.title, "Simulated upload");
    Ok(UploadReceipt {
        video_id,
        video_url,
        title: metadata.snippet_title(),
        privacy_status: metadata.effective_privacy().as_str().to_string(),
        publish_at: metadata.publish_at,
    })
}
