//! Artifact layout and JSON persistence.
//!
//! # Output Structure
//!
//! ```text
//! output/
//! ├── collected_news.json
//! ├── scripts/<stem>.json
//! ├── audio/<stem>.mp3
//! ├── videos/<stem>.mp4
//! ├── workflow_results.jsonl
//! └── workflow_results_<YYYYmmdd_HHMMSS>.json
//! ```
//!
//! # Submodules
//!
//! - [`json`]: reads and writes every JSON artifact

pub mod json;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Paths of every artifact under one output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collected_news(&self) -> PathBuf {
        self.root.join("collected_news.json")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    pub fn script_file(&self, stem: &str) -> PathBuf {
        self.scripts_dir().join(format!("{stem}.json"))
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn results_log(&self) -> PathBuf {
        self.root.join("workflow_results.jsonl")
    }

    pub fn report_file(&self, at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(format!("workflow_results_{}.json", at.format("%Y%m%d_%H%M%S")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("output");
        assert_eq!(layout.collected_news(), PathBuf::from("output/collected_news.json"));
        assert_eq!(layout.script_file("s"), PathBuf::from("output/scripts/s.json"));
        assert_eq!(layout.audio_dir(), PathBuf::from("output/audio"));
        assert_eq!(layout.videos_dir(), PathBuf::from("output/videos"));
        assert_eq!(layout.results_log(), PathBuf::from("output/workflow_results.jsonl"));
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(
            layout.report_file(at),
            PathBuf::from("output/workflow_results_20250506_070809.json")
        );
    }
}
