//! News collection and relevance ranking.
//!
//! Each source module follows the same shape:
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Google News | [`google_news`] | RSS search feed | No key required |
//! | Naver News | [`naver`] | Search API | Needs client id/secret |
//!
//! Every source returns raw [`FeedItem`]s for one keyword. The collector
//! walks keywords and sources one at a time, logs and skips any failing
//! source, then [`rank`]s the pooled items into [`Article`]s: scored, filtered
//! by minimum relevance, sorted best first and deduplicated by URL.

pub mod content;
pub mod google_news;
pub mod naver;

use crate::config::{NewsConfig, NewsSource};
use crate::models::Article;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Duration as StdDuration;
use tracing::{debug, info, instrument, warn};

/// An unscored item as returned by a news source.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub publisher: Option<String>,
    pub keyword: String,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

/// Base URLs of the news sources.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEndpoints {
    pub google_news: String,
    pub naver: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            google_news: google_news::GOOGLE_NEWS_RSS.to_string(),
            naver: naver::NAVER_NEWS_API.to_string(),
        }
    }
}

/// Queries the configured sources for every keyword.
#[derive(Debug, Clone)]
pub struct NewsCollector {
    http: reqwest::Client,
    keywords: Vec<String>,
    config: NewsConfig,
    endpoints: SourceEndpoints,
}

impl NewsCollector {
    pub fn new(keywords: Vec<String>, config: NewsConfig) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(StdDuration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            keywords,
            config,
            endpoints: SourceEndpoints::default(),
        })
    }

    /// Point the sources at other hosts (mirrors, proxies, local fixtures).
    pub fn with_endpoints(mut self, endpoints: SourceEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Collect, score and rank articles for all keywords.
    ///
    /// Never fails: source errors are logged and skipped, so an empty vector
    /// is a normal outcome.
    #[instrument(level = "info", skip_all, fields(keywords = self.keywords.len()))]
    pub async fn collect(&self) -> Vec<Article> {
        let items: Vec<FeedItem> = stream::iter(self.keywords.iter())
            .then(|keyword| self.collect_keyword(keyword))
            .flat_map(stream::iter)
            .collect()
            .await;
        info!(count = items.len(), "Collected raw feed items");

        let items = if self.config.fetch_content {
            self.attach_content(items).await
        } else {
            items
        };

        let articles = rank(items, &self.keywords, self.config.min_relevance, Utc::now());
        info!(count = articles.len(), "Ranked articles");
        articles
    }

    async fn collect_keyword(&self, keyword: &str) -> Vec<FeedItem> {
        let mut items = Vec::new();
        for source in &self.config.sources {
            let fetched = match source {
                NewsSource::GoogleNews => {
                    google_news::search(&self.http, &self.endpoints.google_news, keyword, &self.config).await
                }
                NewsSource::Naver => naver::search(&self.http, &self.endpoints.naver, keyword, &self.config).await,
            };
            match fetched {
                Ok(found) => {
                    debug!(%keyword, ?source, count = found.len(), "Source returned items");
                    items.extend(found);
                }
                Err(e) => warn!(%keyword, ?source, error = %e, "News source failed; skipping"),
            }
        }
        items
    }

    async fn attach_content(&self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        stream::iter(items)
            .then(|mut item| async move {
                match content::scrape_article_body(&self.http, &item.url).await {
                    Ok(body) if !body.is_empty() => item.content = Some(body),
                    Ok(_) => debug!(url = %item.url, "No article body found"),
                    Err(e) => warn!(url = %item.url, error = %e, "Article body fetch failed"),
                }
                item
            })
            .collect()
            .await
    }
}

/// Relevance of one item against the keyword set at time `now`.
///
/// +1.0 per keyword in the title, +0.25 per keyword found only in the
/// description, plus a freshness bonus: 0.5 within 24 hours (or when the date
/// is unknown), 0.25 within 72 hours, otherwise nothing.
pub fn relevance_score(item: &FeedItem, keywords: &[String], now: DateTime<Utc>) -> f64 {
    let title = item.title.to_lowercase();
    let description = item.description.to_lowercase();

    let mut score = 0.0;
    for keyword in keywords.iter().map(|k| k.trim().to_lowercase()).filter(|k| !k.is_empty()) {
        if title.contains(&keyword) {
            score += 1.0;
        } else if description.contains(&keyword) {
            score += 0.25;
        }
    }

    score += match item.published_at {
        None => 0.5,
        Some(at) if now - at <= Duration::hours(24) => 0.5,
        Some(at) if now - at <= Duration::hours(72) => 0.25,
        Some(_) => 0.0,
    };
    score
}

/// Score, filter, sort (best first) and deduplicate by URL.
pub fn rank(items: Vec<FeedItem>, keywords: &[String], min_relevance: f64, now: DateTime<Utc>) -> Vec<Article> {
    let mut articles: Vec<Article> = items
        .into_iter()
        .filter(|item| !item.url.trim().is_empty() && !item.title.trim().is_empty())
        .filter_map(|item| {
            let relevance_score = relevance_score(&item, keywords, now);
            (relevance_score >= min_relevance).then(|| Article {
                title: item.title,
                description: item.description,
                url: item.url,
                source: item.source,
                publisher: item.publisher,
                keyword: item.keyword,
                published_at: item.published_at,
                relevance_score,
                content: item.content,
            })
        })
        .collect();

    articles.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    articles
        .into_iter()
        .unique_by(|a| a.url.trim().to_string())
        .collect()
}
