//! Command-line interface definitions for News Shorts.
//!
//! Each pipeline stage has its own subcommand so it can be run and inspected
//! on its own; `run` chains all of them. Global options override values from
//! the YAML configuration file. API keys given here win over the file; keys
//! missing from both are looked up in the environment by the config layer.

use crate::config::{AiProvider, TtsProvider, UploadProvider};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Shorts pipeline.
///
/// # Examples
///
/// ```sh
/// # Full run with mock providers (no API keys needed)
/// news_shorts run
///
/// # Real providers, keys from the environment
/// OPENAI_API_KEY=... ELEVENLABS_API_KEY=... \
///   news_shorts --ai-provider openai --tts-provider elevenlabs run --target 2
///
/// # Explicit key, overriding the config file
/// news_shorts --ai-provider gemini --ai-api-key "$KEY" script
///
/// # One stage at a time
/// news_shorts collect
/// news_shorts script --index 0
/// news_shorts speak --script output/scripts/<stem>.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "automation.yaml")]
    pub config: PathBuf,

    /// Output directory for every artifact
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// LLM provider for scripts and metadata
    #[arg(long, value_enum)]
    pub ai_provider: Option<AiProvider>,

    /// Text-to-speech provider
    #[arg(long, value_enum)]
    pub tts_provider: Option<TtsProvider>,

    /// Video upload provider
    #[arg(long, value_enum)]
    pub upload_provider: Option<UploadProvider>,

    /// API key for the LLM provider (overrides the config file)
    #[arg(long)]
    pub ai_api_key: Option<String>,

    /// API key for the TTS provider (overrides the config file)
    #[arg(long)]
    pub tts_api_key: Option<String>,

    /// Fail instead of opening the browser consent flow when no OAuth token is stored
    #[arg(long)]
    pub no_browser: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Collect, script, speak, assemble and (optionally) upload the top articles
    Run {
        /// Upload each finished video
        #[arg(long)]
        auto_upload: bool,

        /// Number of videos to produce
        #[arg(long)]
        target: Option<usize>,
    },

    /// Collect and rank news into collected_news.json
    Collect,

    /// Generate the script package for one collected article
    Script {
        /// Position in collected_news.json (0 = most relevant)
        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Synthesize speech for a saved script package
    Speak {
        #[arg(long)]
        script: PathBuf,
    },

    /// Upload a video using the metadata of a saved script package
    Upload {
        #[arg(long)]
        video: PathBuf,

        #[arg(long)]
        script: PathBuf,

        #[arg(long)]
        thumbnail: Option<PathBuf>,

        /// Schedule publication (RFC 3339); the video stays private until then
        #[arg(long)]
        publish_at: Option<DateTime<Utc>>,
    },

    /// Change the title, description or tags of an uploaded video
    Update {
        #[arg(long)]
        video_id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Comma separated; replaces every existing tag
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// List the most recent uploads of the authenticated channel
    Uploads {
        #[arg(long, default_value_t = 10)]
        max: u32,
    },
}
