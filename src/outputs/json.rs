//! JSON artifacts.
//!
//! Envelopes are pretty-printed; the results log is one compact
//! [`WorkflowResult`] per line, appended as soon as each article finishes so a
//! crash mid-run keeps what was already done.

use super::OutputLayout;
use crate::error::Result;
use crate::models::{Article, CollectedNews, ScriptPackage, WorkflowReport, WorkflowResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote JSON");
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn write_collected_news(
    layout: &OutputLayout,
    articles: &[Article],
    collected_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = layout.collected_news();
    let envelope = CollectedNews {
        collected_at,
        total_count: articles.len(),
        articles: articles.to_vec(),
    };
    write_pretty(&path, &envelope).await?;
    Ok(path)
}

pub async fn read_collected_news(layout: &OutputLayout) -> Result<CollectedNews> {
    read_json(&layout.collected_news()).await
}

#[instrument(level = "info", skip(layout, package))]
pub async fn write_script_package(layout: &OutputLayout, stem: &str, package: &ScriptPackage) -> Result<PathBuf> {
    let path = layout.script_file(stem);
    write_pretty(&path, package).await?;
    Ok(path)
}

pub async fn read_script_package(path: &Path) -> Result<ScriptPackage> {
    read_json(path).await
}

#[instrument(level = "info", skip_all, fields(total = report.total_videos))]
pub async fn write_report(layout: &OutputLayout, report: &WorkflowReport) -> Result<PathBuf> {
    let path = layout.report_file(report.finished_at);
    write_pretty(&path, report).await?;
    Ok(path)
}

pub async fn append_result(layout: &OutputLayout, result: &WorkflowResult) -> Result<()> {
    let path = layout.results_log();
    fs::create_dir_all(layout.root()).await?;
    let mut line = serde_json::to_string(result)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Every record in the results log, oldest first. A missing log is empty.
pub async fn read_results(layout: &OutputLayout) -> Result<Vec<WorkflowResult>> {
    let path = layout.results_log();
    if !fs::try_exists(&path).await? {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(&path).await?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}
