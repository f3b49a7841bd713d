//! # News Shorts
//!
//! Turns trending news into narrated short videos: collect articles for a set
//! of keywords, write a narration script with an LLM, synthesize speech, drop
//! a video artifact next to it and optionally upload it to YouTube.
//!
//! ## Usage
//!
//! ```sh
//! news_shorts run                       # every stage, mock providers by default
//! news_shorts --ai-provider openai run  # OPENAI_API_KEY or AI_API_KEY required
//! news_shorts uploads --max 5           # recent uploads of the channel
//! news_shorts update --video-id abc123 --title "New title"
//! ```
//!
//! ## Architecture
//!
//! 1. **Collecting**: Google News RSS and Naver search per keyword, scored and ranked
//! 2. **Scripting**: script, thumbnail titles and upload metadata from the LLM
//! 3. **Speech**: chunked TTS into one MP3 per article
//! 4. **Video**: placeholder artifact at the video path
//! 5. **Upload**: YouTube resumable upload when auto-upload is on
//!
//! Everything runs sequentially on a single-threaded runtime.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod collector;
mod config;
mod error;
mod models;
mod outputs;
mod script;
mod tts;
mod uploader;
mod utils;
mod video;
mod workflow;

use cli::{Cli, Command};
use config::AutomationConfig;
use outputs::json;
use uploader::MetadataUpdate;
use utils::{artifact_stem, ensure_writable_dir, truncate_for_log};
use workflow::Workflow;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_shorts starting up");

    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let config = load_config(&args)?;
    let workflow = Workflow::from_config(config)?;

    if let Err(e) = ensure_writable_dir(workflow.layout().root()).await {
        error!(
            path = %workflow.layout().root().display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    match args.command {
        Command::Run { .. } => {
            let report = workflow.run().await?;
            for (i, result) in report.results.iter().enumerate() {
                match &result.error {
                    None => info!(index = i + 1, title = %result.article.title, "Completed"),
                    Some(e) => warn!(
                        index = i + 1,
                        title = %result.article.title,
                        stage = ?result.failed_stage,
                        error = %truncate_for_log(e, 300),
                        "Failed"
                    ),
                }
            }
        }
        Command::Collect => {
            let articles = workflow.collect().await?;
            for (i, article) in articles.iter().enumerate() {
                info!(index = i, score = article.relevance_score, source = %article.source, title = %article.title);
            }
            info!(count = articles.len(), path = %workflow.layout().collected_news().display(), "Collected");
        }
        Command::Script { index } => {
            let news = json::read_collected_news(workflow.layout()).await?;
            let Some(article) = news.articles.get(index) else {
                return Err(format!(
                    "no article at index {index}: collected_news.json holds {}",
                    news.articles.len()
                )
                .into());
            };
            let stem = artifact_stem(chrono::Utc::now(), index + 1, &article.title);
            let (path, package) = workflow.write_script(&stem, article).await?;
            info!(
                path = %path.display(),
                title = %package.details.title,
                thumbnail = ?package.script.best_thumbnail_title(),
                "Script written"
            );
        }
        Command::Speak { script } => {
            let package = json::read_script_package(&script).await?;
            let audio = workflow.speak(&package, &file_stem(&script)?).await?;
            info!(path = %audio.file_path.display(), duration_secs = audio.duration_secs, "Audio written");
        }
        Command::Upload {
            video,
            script,
            thumbnail,
            publish_at,
        } => {
            let package = json::read_script_package(&script).await?;
            let receipt = workflow.upload(&video, &package, thumbnail, publish_at).await?;
            info!(video_id = %receipt.video_id, url = %receipt.video_url, privacy = %receipt.privacy_status, "Uploaded");
        }
        Command::Update {
            video_id,
            title,
            description,
            tags,
        } => {
            let update = MetadataUpdate {
                title,
                description,
                tags,
            };
            let video = workflow.uploader().update_video(&video_id, &update).await?;
            info!(video_id = %video.video_id, title = %video.title, url = %video.url, "Updated");
        }
        Command::Uploads { max } => {
            let videos = workflow.uploader().list_recent_uploads(max).await?;
            if videos.is_empty() {
                info!(uploader = workflow.uploader().name(), "No uploads found");
            }
            for video in videos {
                info!(title = %video.title, url = %video.url, published_at = %video.published_at);
            }
        }
    }

    info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "news_shorts finished");
    Ok(())
}

/// Configuration file plus command-line overrides.
fn load_config(args: &Cli) -> Result<AutomationConfig, Box<dyn Error>> {
    // the default path may legitimately be absent; an explicit one may not
    let required = args.config != Path::new("automation.yaml");
    let mut config = AutomationConfig::load(&args.config, required)?;

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(provider) = args.ai_provider {
        config.ai.provider = provider;
    }
    if let Some(provider) = args.tts_provider {
        config.tts.provider = provider;
    }
    if let Some(provider) = args.upload_provider {
        config.upload.provider = provider;
    }
    if args.ai_api_key.is_some() {
        config.ai.api_key = args.ai_api_key.clone();
    }
    if args.tts_api_key.is_some() {
        config.tts.api_key = args.tts_api_key.clone();
    }
    if args.no_browser {
        config.upload.interactive_auth = false;
    }
    if let Command::Run { auto_upload, target } = &args.command {
        config.upload.auto_upload |= *auto_upload;
        if let Some(target) = target {
            config.target_videos_per_day = *target;
        }
    }

    config.validate()?;
    info!(
        keywords = config.keywords.len(),
        target = config.target_videos_per_day,
        ai = config.ai.provider.name(),
        tts = config.tts.provider.name(),
        "Configuration loaded"
    );
    Ok(config)
}

fn file_stem(path: &Path) -> Result<String, Box<dyn Error>> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{} has no file name", path.display()).into())
}
