//! Naver News search API.
//!
//! Requires `NAVER_CLIENT_ID` / `NAVER_CLIENT_SECRET` (or the matching config
//! fields). Titles and descriptions arrive with `<b>` highlight markup and
//! HTML entities, both stripped here.

use super::FeedItem;
use super::content::strip_html;
use super::google_news::parse_pub_date;
use crate::config::NewsConfig;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use tracing::{info, instrument};

pub const NAVER_NEWS_API: &str = "https://openapi.naver.com/v1/search/news.json";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    #[serde(default)]
    originallink: String,
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

#[instrument(level = "info", skip(http, config))]
pub async fn search(http: &reqwest::Client, base: &str, keyword: &str, config: &NewsConfig) -> Result<Vec<FeedItem>> {
    let client_id = config
        .naver_client_id
        .clone()
        .or_else(|| std::env::var("NAVER_CLIENT_ID").ok())
        .ok_or(PipelineError::MissingApiKey {
            provider: "Naver",
            env_var: "NAVER_CLIENT_ID",
        })?;
    let client_secret = config
        .naver_client_secret
        .clone()
        .or_else(|| std::env::var("NAVER_CLIENT_SECRET").ok())
        .ok_or(PipelineError::MissingApiKey {
            provider: "Naver",
            env_var: "NAVER_CLIENT_SECRET",
        })?;

    let display = config.max_per_keyword.clamp(1, 100).to_string();
    let response = http
        .get(base)
        .header("X-Naver-Client-Id", client_id)
        .header("X-Naver-Client-Secret", client_secret)
        .query(&[("query", keyword), ("display", display.as_str()), ("sort", "sim")])
        .send()
        .await?;
    let raw = PipelineError::check("Naver", response).await?.text().await?;
    let items = parse_response(&raw, keyword)?;
    info!(count = items.len(), "Fetched Naver items");
    Ok(items)
}

pub fn parse_response(raw: &str, keyword: &str) -> Result<Vec<FeedItem>> {
    let response: SearchResponse = serde_json::from_str(raw)?;
    Ok(response
        .items
        .into_iter()
        .map(|item| {
            // originallink points at the publisher; link may be a Naver mirror
            let url = if item.originallink.trim().is_empty() {
                item.link
            } else {
                item.originallink
            };
            FeedItem {
                title: strip_html(&item.title),
                description: strip_html(&item.description),
                url: url.trim().to_string(),
                source: "naver".to_string(),
                publisher: None,
                keyword: keyword.to_string(),
                published_at: item.pub_date.as_deref().and_then(parse_pub_date),
                content: None,
            }
        })
        .collect())
}
