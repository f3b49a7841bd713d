//! End-to-end driver: collect, then script → speech → video → upload for each
//! of the top articles.
//!
//! Articles are processed one at a time. A failing stage ends that article's
//! run; its [`WorkflowResult`] records the stage and error and the loop moves
//! on. Every result is appended to the results log as soon as it exists, and
//! a full [`WorkflowReport`] is written at the end.

use crate::api::LlmClient;
use crate::collector::NewsCollector;
use crate::config::AutomationConfig;
use crate::error::{PipelineError, Result};
use crate::models::{
    Article, AudioArtifact, RunStatus, Script, ScriptPackage, Stage, UploadReceipt, UploadStatus, WorkflowReport,
    WorkflowResult,
};
use crate::outputs::{OutputLayout, json};
use crate::script::ScriptGenerator;
use crate::tts::SpeechSynthesizer;
use crate::uploader::{Uploader, VideoMetadata};
use crate::utils::{artifact_stem, ensure_writable_dir};
use crate::video::VideoAssembler;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct Workflow {
    config: AutomationConfig,
    layout: OutputLayout,
    collector: NewsCollector,
    generator: ScriptGenerator,
    synthesizer: SpeechSynthesizer,
    assembler: VideoAssembler,
    uploader: Uploader,
}

impl Workflow {
    /// Build every stage from configuration. Fails fast on missing API keys.
    pub fn from_config(config: AutomationConfig) -> Result<Self> {
        let layout = OutputLayout::new(&config.output_dir);
        let collector = NewsCollector::new(config.keywords.clone(), config.news.clone())?;
        let generator = ScriptGenerator::new(LlmClient::from_config(&config.ai)?, config.ai.thumbnail_title_count);
        let synthesizer = SpeechSynthesizer::from_config(&config.tts, layout.audio_dir())?;
        let assembler = VideoAssembler::new(layout.videos_dir());
        let uploader = Uploader::from_config(&config.upload)?;
        info!(
            llm = generator.provider_name(),
            tts = synthesizer.provider().name(),
            uploader = uploader.name(),
            output = %layout.root().display(),
            "Workflow ready"
        );
        Ok(Self {
            config,
            layout,
            collector,
            generator,
            synthesizer,
            assembler,
            uploader,
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    /// Full run: collect, persist `collected_news.json`, process the top K.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<WorkflowReport> {
        ensure_writable_dir(self.layout.root()).await?;
        let articles = self.collect().await?;
        if articles.is_empty() {
            warn!("No articles collected; nothing to produce");
        }
        self.run_articles(&articles).await
    }

    /// Collect and persist the ranked articles.
    pub async fn collect(&self) -> Result<Vec<Article>> {
        let articles = self.collector.collect().await;
        json::write_collected_news(&self.layout, &articles, Utc::now()).await?;
        Ok(articles)
    }

    /// Process the first `target_videos_per_day` articles in order.
    ///
    /// Each article's result is appended to the results log as soon as it
    /// exists; the full report is written once every article has run.
    ///
    /// # Arguments
    ///
    /// * `articles` - Ranked articles, best first
    ///
    /// # Returns
    ///
    /// A [`WorkflowReport`] with exactly `min(target, articles.len())` results.
    /// Failed articles are counted in it, not returned as errors.
    ///
    /// # Errors
    ///
    /// Only when the results log or the report cannot be written.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let news = json::read_collected_news(workflow.layout()).await?;
    /// let report = workflow.run_articles(&news.articles).await?;
    /// println!("{}/{} completed", report.completed, report.total_videos);
    /// ```
    pub async fn run_articles(&self, articles: &[Article]) -> Result<WorkflowReport> {
        let started_at = Utc::now();
        let target = self.config.target_videos_per_day;
        info!(available = articles.len(), target, "Starting article runs");

        let mut results = Vec::with_capacity(target.min(articles.len()));
        for (i, article) in articles.iter().take(target).enumerate() {
            let result = self.process(i + 1, article).await;
            json::append_result(&self.layout, &result).await?;
            results.push(result);
        }

        let completed = results.iter().filter(|r| r.is_completed()).count();
        let report = WorkflowReport {
            started_at,
            finished_at: Utc::now(),
            total_videos: results.len(),
            completed,
            failed: results.len() - completed,
            results,
        };
        let path = json::write_report(&self.layout, &report).await?;
        info!(
            completed = report.completed,
            failed = report.failed,
            report = %path.display(),
            "Workflow finished"
        );
        Ok(report)
    }

    /// One article through every stage. Never fails; errors land on the result.
    ///
    /// # Arguments
    ///
    /// * `index` - 1-based position in the run, used in artifact names
    /// * `article` - The article to produce a video for
    ///
    /// # Returns
    ///
    /// A completed result, or a failed one naming the first stage that broke
    /// along with whatever artifacts were produced before it.
    #[instrument(level = "info", skip(self, article), fields(title = %article.title))]
    pub async fn process(&self, index: usize, article: &Article) -> WorkflowResult {
        let start = Instant::now();
        let mut result = WorkflowResult::started(article.clone());
        let stem = artifact_stem(Utc::now(), index, &article.title);

        let package = match self.write_script(&stem, article).await {
            Ok((_, package)) => package,
            Err(e) => return stage_failed(result, Stage::Script, e),
        };
        result.script = Some(package.script.clone());
        result.thumbnail_title = Some(thumbnail_title(&package.script, article));

        let audio = match self.speak(&package, &stem).await {
            Ok(audio) => audio,
            Err(e) => return stage_failed(result, Stage::Speech, e),
        };
        result.audio_path = Some(audio.file_path.clone());

        let video = match self
            .assembler
            .assemble(&stem, &package.details.title, &package.script, &audio)
            .await
        {
            Ok(path) => path,
            Err(e) => return stage_failed(result, Stage::Video, e),
        };
        result.video_path = Some(video.clone());

        if self.config.upload.auto_upload {
            match self.upload(&video, &package, None, None).await {
                Ok(receipt) => {
                    result.upload_status = UploadStatus::Uploaded {
                        video_id: receipt.video_id,
                        video_url: receipt.video_url,
                    };
                }
                Err(e) => {
                    result.upload_status = UploadStatus::Failed { error: e.to_string() };
                    return stage_failed(result, Stage::Upload, e);
                }
            }
        } else {
            result.upload_status = UploadStatus::Skipped;
        }

        result.status = RunStatus::Completed;
        info!(index, elapsed_ms = start.elapsed().as_millis() as u64, "Article completed");
        result
    }

    /// Script stage: generate the package and persist it under `scripts/`.
    pub async fn write_script(&self, stem: &str, article: &Article) -> Result<(PathBuf, ScriptPackage)> {
        let package = self.generator.generate_package(article).await?;
        let path = json::write_script_package(&self.layout, stem, &package).await?;
        Ok((path, package))
    }

    pub async fn speak(&self, package: &ScriptPackage, stem: &str) -> Result<AudioArtifact> {
        self.synthesizer.synthesize(&package.script.narration(), stem).await
    }

    pub async fn upload(
        &self,
        video: &Path,
        package: &ScriptPackage,
        thumbnail: Option<PathBuf>,
        publish_at: Option<DateTime<Utc>>,
    ) -> Result<UploadReceipt> {
        let metadata = VideoMetadata {
            thumbnail,
            publish_at,
            ..VideoMetadata::from_details(&package.details, &self.config.upload)
        };
        self.uploader.upload(video, &metadata).await
    }
}

/// Best candidate, or the headline when the LLM gave none.
fn thumbnail_title(script: &Script, article: &Article) -> String {
    script
        .best_thumbnail_title()
        .map(str::to_string)
        .unwrap_or_else(|| article.title.clone())
}

fn stage_failed(result: WorkflowResult, stage: Stage, e: PipelineError) -> WorkflowResult {
    if e.is_recoverable() {
        warn!(%stage, error = %e, "Stage failed; switch provider or retry later");
    } else {
        error!(%stage, error = %e, "Stage failed; manual action required");
    }
    result.fail(stage, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;

    fn config(dir: &Path, target: usize) -> AutomationConfig {
        AutomationConfig {
            keywords: vec!["AI".to_string()],
            target_videos_per_day: target,
            output_dir: dir.join("output"),
            ..AutomationConfig::default()
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| article(&format!("Story {i}"), &format!("https://example.com/{i}"), 3.0 - i as f64 * 0.1))
            .collect()
    }

    #[tokio::test]
    async fn test_exactly_target_results_when_enough_articles() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = Workflow::from_config(config(dir.path(), 3)).unwrap();
        let report = workflow.run_articles(&articles(5)).await.unwrap();

        assert_eq!(report.total_videos, 3);
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed, 0);
        let titles: Vec<_> = report.results.iter().map(|r| r.article.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 0", "Story 1", "Story 2"]);
        for r in &report.results {
            assert_eq!(r.upload_status, UploadStatus::Skipped);
            assert!(r.audio_path.as_ref().unwrap().exists());
            assert!(r.video_path.as_ref().unwrap().exists());
            assert_eq!(r.thumbnail_title.as_deref(), Some("Is this for real?"));
        }

        let logged = json::read_results(workflow.layout()).await.unwrap();
        assert_eq!(logged, report.results);
    }

    #[test]
    fn test_thumbnail_title_falls_back_to_headline() {
        let a = article("Rates hold steady", "https://example.com/r", 1.0);
        let mut script = Script {
            intro: "Hi.".into(),
            body: "Body.".into(),
            conclusion: "Bye.".into(),
            thumbnail_title_candidates: vec![],
        };
        assert_eq!(thumbnail_title(&script, &a), "Rates hold steady");

        script.thumbnail_title_candidates = vec!["Frozen again?".into()];
        assert_eq!(thumbnail_title(&script, &a), "Frozen again?");
    }

    #[tokio::test]
    async fn test_fewer_results_when_fewer_articles() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = Workflow::from_config(config(dir.path(), 3)).unwrap();
        let report = workflow.run_articles(&articles(2)).await.unwrap();
        assert_eq!(report.total_videos, 2);

        let none = workflow.run_articles(&[]).await.unwrap();
        assert_eq!(none.total_videos, 0);
    }

    #[tokio::test]
    async fn test_stage_failure_is_recorded_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        std::fs::create_dir_all(&cfg.output_dir).unwrap();
        // a file where the audio directory should be makes the speech stage fail
        std::fs::write(cfg.output_dir.join("audio"), b"not a dir").unwrap();

        let workflow = Workflow::from_config(cfg).unwrap();
        let report = workflow.run_articles(&articles(3)).await.unwrap();

        assert_eq!(report.total_videos, 2);
        assert_eq!(report.failed, 2);
        for r in &report.results {
            assert_eq!(r.status, RunStatus::Failed);
            assert_eq!(r.failed_stage, Some(Stage::Speech));
            assert!(r.error.is_some());
            assert!(r.script.is_some());
            assert_eq!(r.audio_path, None);
            assert_eq!(r.upload_status, UploadStatus::NotAttempted);
        }
        assert_eq!(json::read_results(workflow.layout()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_upload_with_mock_uploader() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 1);
        cfg.upload.auto_upload = true;
        let workflow = Workflow::from_config(cfg).unwrap();
        let report = workflow.run_articles(&articles(1)).await.unwrap();

        let result = &report.results[0];
        assert!(result.is_completed());
        match &result.upload_status {
            UploadStatus::Uploaded { video_id, .. } => assert!(video_id.starts_with("MOCK_")),
            other => panic!("unexpected upload status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_written_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1);
        let out = cfg.output_dir.clone();
        let workflow = Workflow::from_config(cfg).unwrap();
        workflow.run_articles(&articles(1)).await.unwrap();

        let reports: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("workflow_results_") && name.ends_with(".json"))
            .collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(std::fs::read_dir(out.join("scripts")).unwrap().count(), 1);
    }
}
