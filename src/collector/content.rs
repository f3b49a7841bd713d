//! HTML helpers: markup stripping for feed snippets and article body scraping.

use crate::error::{PipelineError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// Containers tried in order when looking for the article body.
static BODY_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", ".article_body", "#articleBodyContents", ".news_end"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

const SKIPPED_TAGS: [&str; 3] = ["script", "style", "iframe"];

/// Remove tags, decode entities and collapse whitespace.
///
/// Inline markup such as Naver's `<b>` highlights joins without adding spaces.
pub fn strip_html(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text: String = html.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Download an article page and extract its body text.
///
/// Returns an empty string when none of the known containers are present.
#[instrument(level = "info", skip(http))]
pub async fn scrape_article_body(http: &reqwest::Client, url: &str) -> Result<String> {
    let response = http.get(url).send().await?;
    let body = PipelineError::check("article", response).await?.text().await?;
    let text = extract_body(&body);
    debug!(bytes = text.len(), "Parsed article body");
    Ok(text)
}

/// Text of the first matching body container, one non-empty line per text node.
pub fn extract_body(page: &str) -> String {
    let document = Html::parse_document(page);
    let Some(container) = BODY_SELECTORS
        .iter()
        .find_map(|selector| document.select(selector).next())
    else {
        return String::new();
    };

    container
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let skipped = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
            });
            (!skipped).then(|| text.trim().to_string())
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
