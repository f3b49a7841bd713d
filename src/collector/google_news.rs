//! Google News RSS search.
//!
//! `https://news.google.com/rss/search?q=<keyword>&hl=<lang>&gl=<region>&ceid=<region>:<lang>`
//! needs no API key. Items carry a title of the form `Headline - Publisher`,
//! an HTML snippet as description, an RFC 2822 `pubDate` and a `<source>`
//! element naming the publisher.

use super::FeedItem;
use crate::config::NewsConfig;
use crate::collector::content::strip_html;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

pub const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<RssSource>,
}

#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "$text", default)]
    name: String,
}

/// Search feed URL for `keyword` under `base` (normally [`GOOGLE_NEWS_RSS`]).
pub fn search_url(base: &str, keyword: &str, config: &NewsConfig) -> String {
    format!(
        "{base}?q={}&hl={lang}&gl={region}&ceid={region}:{lang}",
        urlencoding::encode(keyword),
        lang = config.language,
        region = config.region,
    )
}

/// Fetch the RSS search feed for one keyword.
#[instrument(level = "info", skip(http, config))]
pub async fn search(http: &reqwest::Client, base: &str, keyword: &str, config: &NewsConfig) -> Result<Vec<FeedItem>> {
    let url = search_url(base, keyword, config);
    let response = http.get(&url).send().await?;
    let xml = PipelineError::check("Google News", response).await?.text().await?;
    let items = parse_feed(&xml, keyword, config.max_per_keyword)?;
    info!(count = items.len(), "Fetched Google News items");
    Ok(items)
}

/// Parse an RSS document into at most `limit` items.
pub fn parse_feed(xml: &str, keyword: &str, limit: usize) -> Result<Vec<FeedItem>> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| PipelineError::Feed(e.to_string()))?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .take(limit)
        .map(|item| {
            let publisher = item
                .source
                .map(|s| s.name.trim().to_string())
                .filter(|s| !s.is_empty());
            FeedItem {
                title: clean_title(&item.title, publisher.as_deref()),
                description: item.description.as_deref().map(strip_html).unwrap_or_default(),
                url: item.link.trim().to_string(),
                source: "google_news".to_string(),
                publisher,
                keyword: keyword.to_string(),
                published_at: item.pub_date.as_deref().and_then(parse_pub_date),
                content: None,
            }
        })
        .collect())
}

/// Drop the trailing ` - Publisher` Google appends to every headline.
fn clean_title(title: &str, publisher: Option<&str>) -> String {
    let title = title.trim();
    match publisher {
        Some(p) => title
            .strip_suffix(p)
            .and_then(|t| t.trim_end().strip_suffix('-'))
            .map(|t| t.trim_end().to_string())
            .unwrap_or_else(|| title.to_string()),
        None => title.to_string(),
    }
}

pub(crate) fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
