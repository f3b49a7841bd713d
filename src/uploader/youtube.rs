//! YouTube Data API v3 client: resumable upload, thumbnails, metadata edits
//! and channel listing.

use super::{MetadataUpdate, VideoMetadata};
use super::oauth::Authenticator;
use crate::error::{PipelineError, Result};
use crate::models::{UploadReceipt, UploadedVideo};
use crate::utils::truncate_chars;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

const UPLOAD_API: &str = "https://www.googleapis.com/upload/youtube/v3";
const DATA_API: &str = "https://www.googleapis.com/youtube/v3";
const PROVIDER: &str = "YouTube";

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelList {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Channel {
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemList {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    auth: Authenticator,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, auth: Authenticator) -> Self {
        Self { http, auth }
    }

    /// Upload a video with a resumable session, then set its thumbnail.
    #[instrument(level = "info", skip(self, metadata), fields(path = %video.display()))]
    pub async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> Result<UploadReceipt> {
        let token = self.auth.access_token().await?;
        let content = fs::read(video).await?;

        let init = self
            .http
            .post(format!("{UPLOAD_API}/videos"))
            .bearer_auth(&token)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", content.len().to_string())
            .json(&metadata.request_body())
            .send()
            .await?;
        let init = PipelineError::check(PROVIDER, init).await?;
        let session = init
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::MalformedResponse {
                provider: PROVIDER.to_string(),
                reason: "resumable session response has no Location header".to_string(),
            })?;

        info!(bytes = content.len(), title = %metadata.title, "Uploading video");
        let response = self
            .http
            .put(&session)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "video/*")
            .body(content)
            .send()
            .await?;
        let resource: VideoResource = PipelineError::check(PROVIDER, response).await?.json().await?;
        let video_url = watch_url(&resource.id);
        info!(video_id = %resource.id, %video_url, "Upload complete");

        if let Some(thumbnail) = &metadata.thumbnail {
            if let Err(e) = self.set_thumbnail(&token, &resource.id, thumbnail).await {
                warn!(video_id = %resource.id, error = %e, "Thumbnail upload failed");
            }
        }

        Ok(UploadReceipt {
            video_id: resource.id,
            video_url,
            title: metadata.snippet_title(),
            privacy_status: metadata.effective_privacy().as_str().to_string(),
            publish_at: metadata.publish_at,
        })
    }

    async fn set_thumbnail(&self, token: &str, video_id: &str, thumbnail: &Path) -> Result<()> {
        let image = fs::read(thumbnail).await?;
        let mime = match thumbnail.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            _ => "image/jpeg",
        };
        let response = self
            .http
            .post(format!("{UPLOAD_API}/thumbnails/set"))
            .bearer_auth(token)
            .query(&[("videoId", video_id)])
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(image)
            .send()
            .await?;
        PipelineError::check(PROVIDER, response).await?;
        info!(%video_id, path = %thumbnail.display(), "Thumbnail set");
        Ok(())
    }

    /// Rewrite the snippet of an uploaded video.
    ///
    /// `videos.update` replaces the whole snippet, so the current one is read
    /// first with `videos.list` and only the fields set in `update` change.
    #[instrument(level = "info", skip(self, update))]
    pub async fn update_video(&self, video_id: &str, update: &MetadataUpdate) -> Result<UploadedVideo> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{DATA_API}/videos"))
            .bearer_auth(&token)
            .query(&[("part", "snippet"), ("id", video_id)])
            .send()
            .await?;
        let raw = PipelineError::check(PROVIDER, response).await?.text().await?;
        let current = current_snippet(&raw, video_id)?;

        let body = json!({ "id": video_id, "snippet": update.apply_to(&current) });
        let response = self
            .http
            .put(format!("{DATA_API}/videos"))
            .bearer_auth(&token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;
        let raw = PipelineError::check(PROVIDER, response).await?.text().await?;
        let video = parse_video(&raw)?;
        info!(%video_id, title = %video.title, "Video metadata updated");
        Ok(video)
    }

    /// Most recent uploads of the authenticated channel.
    #[instrument(level = "info", skip(self))]
    pub async fn list_recent_uploads(&self, max_results: u32) -> Result<Vec<UploadedVideo>> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{DATA_API}/channels"))
            .bearer_auth(&token)
            .query(&[("part", "contentDetails"), ("mine", "true")])
            .send()
            .await?;
        let raw = PipelineError::check(PROVIDER, response).await?.text().await?;
        let Some(playlist) = uploads_playlist(&raw)? else {
            return Ok(Vec::new());
        };

        let max = max_results.clamp(1, 50).to_string();
        let response = self
            .http
            .get(format!("{DATA_API}/playlistItems"))
            .bearer_auth(&token)
            .query(&[("part", "snippet"), ("playlistId", playlist.as_str()), ("maxResults", max.as_str())])
            .send()
            .await?;
        let raw = PipelineError::check(PROVIDER, response).await?.text().await?;
        parse_playlist_items(&raw)
    }
}

fn current_snippet(raw: &str, video_id: &str) -> Result<Value> {
    let list: VideoList = serde_json::from_str(raw)?;
    list.items
        .into_iter()
        .next()
        .map(|item| item.snippet)
        .ok_or_else(|| PipelineError::Config(format!("video not found on the channel: {video_id}")))
}

fn parse_video(raw: &str) -> Result<UploadedVideo> {
    let item: VideoItem = serde_json::from_str(raw)?;
    let text = |key: &str| item.snippet.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(UploadedVideo {
        url: watch_url(&item.id),
        title: text("title"),
        description: truncate_chars(&text("description"), 100),
        published_at: text("publishedAt"),
        video_id: item.id,
    })
}

fn uploads_playlist(raw: &str) -> Result<Option<String>> {
    let channels: ChannelList = serde_json::from_str(raw)?;
    Ok(channels
        .items
        .into_iter()
        .next()
        .map(|c| c.content_details.related_playlists.uploads))
}

fn parse_playlist_items(raw: &str) -> Result<Vec<UploadedVideo>> {
    let list: PlaylistItemList = serde_json::from_str(raw)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| {
            let s = item.snippet;
            UploadedVideo {
                url: watch_url(&s.resource_id.video_id),
                video_id: s.resource_id.video_id,
                title: s.title,
                description: truncate_chars(&s.description, 100),
                published_at: s.published_at,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploads_playlist() {
        let raw = r#"{"items":[{"id":"UC1","contentDetails":{"relatedPlaylists":{"likes":"","uploads":"UU1"}}}]}"#;
        assert_eq!(uploads_playlist(raw).unwrap().as_deref(), Some("UU1"));
        assert_eq!(uploads_playlist(r#"{"items":[]}"#).unwrap(), None);
        assert_eq!(uploads_playlist(r#"{"kind":"youtube#channelListResponse"}"#).unwrap(), None);
    }

    #[test]
    fn test_current_snippet() {
        let raw = r#"{"kind":"youtube#videoListResponse","items":[{"id":"abc123","snippet":{"title":"Old","categoryId":"25"}}]}"#;
        let snippet = current_snippet(raw, "abc123").unwrap();
        assert_eq!(snippet["title"], "Old");

        let err = current_snippet(r#"{"items":[]}"#, "gone").unwrap_err();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_parse_updated_video() {
        let raw = r#"{"id":"abc123","snippet":{"title":"New","description":"Updated","publishedAt":"2025-05-06T09:00:00Z"}}"#;
        let video = parse_video(raw).unwrap();
        assert_eq!(video.video_id, "abc123");
        assert_eq!(video.title, "New");
        assert_eq!(video.description, "Updated");
        assert_eq!(video.published_at, "2025-05-06T09:00:00Z");
        assert_eq!(video.url, watch_url("abc123"));
    }

    #[test]
    fn test_parse_playlist_items() {
        let long = "d".repeat(150);
        let raw = format!(
            r#"{{"items":[{{"snippet":{{"title":"First","description":"{long}","publishedAt":"2025-05-06T09:00:00Z",
                "resourceId":{{"kind":"youtube#video","videoId":"abc123"}}}}}}]}}"#
        );
        let videos = parse_playlist_items(&raw).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "abc123");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(videos[0].description.chars().count(), 100);
        assert_eq!(videos[0].published_at, "2025-05-06T09:00:00Z");
    }
}
