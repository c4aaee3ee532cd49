//! # Pipeline orchestrator
//!
//! Runs one video job as a linear state machine:
//!
//! `Started → NewsFetched → ScriptGenerated → MetadataGenerated →
//! [AudioGenerated] → [VideoGenerated] → [ThumbnailGenerated] → [Uploaded] →
//! Succeeded`, with `Failed` reachable from any state.
//!
//! News, script and metadata are mandatory; their errors end the run. The
//! bracketed stages run only in full-pipeline mode, only when configured, and
//! only when their upstream artifact exists. Anything else skips them.

pub mod stages;

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::generate::Writer;
use crate::ingest::types::Region;
use crate::ingest::NewsAggregator;
use crate::model::{PipelineRun, RunState, Stage};
use crate::notify::{DynSink, RunNotifier};
use crate::parse::{MetadataParser, ScriptParser};
pub use stages::{
    AudioRenderer, AudioTrack, Capability, OptionalStages, Publisher, ThumbnailRenderer,
    UploadRequest, VideoRenderer,
};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline runs by outcome.");
        describe_counter!("pipeline_stage_skipped_total", "Optional stages skipped.");
        describe_histogram!("pipeline_stage_ms", "Stage duration in milliseconds.");
    });
}

/// A mandatory stage failed. Carries the run as it stood, in state `Failed`.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source:#}")]
pub struct PipelineError {
    pub stage: Stage,
    pub run: Box<PipelineRun>,
    #[source]
    pub source: anyhow::Error,
}

/// Run-independent knobs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub full_pipeline: bool,
    pub regions: Vec<Region>,
    pub max_per_region: usize,
    pub work_dir: PathBuf,
    pub placeholder_url: String,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            full_pipeline: cfg.pipeline.full_pipeline,
            regions: cfg.news.regions(),
            max_per_region: cfg.news.max_per_region,
            work_dir: cfg.pipeline.work_dir.clone(),
            placeholder_url: cfg.pipeline.placeholder_url.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Unique within the process, sortable by start time.
fn next_run_id() -> String {
    static SEQ: AtomicU32 = AtomicU32::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{seq:04}", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Outcome of one optional stage attempt.
enum Attempt<T> {
    Skipped(&'static str),
    Ran(anyhow::Result<T>),
}

async fn timed<F: Future>(stage: Stage, fut: F) -> F::Output {
    let t0 = Instant::now();
    let out = fut.await;
    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("pipeline_stage_ms", "stage" => stage.label()).record(ms);
    debug!(stage = %stage, ms, "stage finished");
    out
}

/// Stateless across runs; clone freely and call `run` concurrently.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    news: NewsAggregator,
    writer: Writer,
    optional: OptionalStages,
    settings: PipelineSettings,
    notifier: RunNotifier,
}

impl PipelineOrchestrator {
    pub fn new(
        news: NewsAggregator,
        writer: Writer,
        optional: OptionalStages,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            news,
            writer,
            optional,
            settings,
            notifier: RunNotifier::disabled(),
        }
    }

    pub fn with_notifier(mut self, notifier: RunNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Copy that reports to `recipient` through `sink`.
    pub fn for_recipient(&self, sink: DynSink, recipient: impl Into<String>) -> Self {
        self.clone().with_notifier(RunNotifier::new(sink, recipient))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one run. On failure the error carries the failed run.
    pub async fn run(&self) -> Result<PipelineRun, PipelineError> {
        ensure_metrics_described();

        let id = next_run_id();
        let work_dir = self.settings.work_dir.join(&id);
        let mut run = PipelineRun::start(id, work_dir, self.settings.placeholder_url.clone());
        info!(
            run_id = %run.id,
            full_pipeline = self.settings.full_pipeline,
            provider = self.writer.provider_name(),
            "pipeline started"
        );
        self.notifier.started().await;

        if let Err((stage, e)) = self.run_mandatory(&mut run).await {
            return Err(self.fail(run, stage, e).await);
        }

        if self.settings.full_pipeline {
            self.run_optional(&mut run).await;
        } else {
            info!(run_id = %run.id, "full pipeline disabled, skipping render and upload");
        }

        run.advance(RunState::Succeeded);
        counter!("pipeline_runs_total", "outcome" => "succeeded").increment(1);
        info!(
            run_id = %run.id,
            title = %run.metadata.title,
            url = %run.published_url(),
            skipped = ?run.skipped,
            "pipeline succeeded"
        );
        self.notifier
            .succeeded(&run.metadata.title, run.published_url())
            .await;
        Ok(run)
    }

    async fn run_mandatory(&self, run: &mut PipelineRun) -> Result<(), (Stage, anyhow::Error)> {
        // News
        let news = timed(Stage::News, async {
            let bundle = self
                .news
                .fetch(&self.settings.regions, self.settings.max_per_region)
                .await;
            let document = NewsAggregator::format(&bundle);
            let summary = self.writer.summarize_news(&document).await?;
            anyhow::Ok((bundle, document, summary))
        })
        .await;
        let (bundle, document, summary) = news.map_err(|e| (Stage::News, e))?;
        info!(run_id = %run.id, items = bundle.total_items(), "news fetched");
        run.news = bundle;
        run.news_document = document;
        run.news_summary = summary;
        run.advance(RunState::NewsFetched);

        // Script
        let raw = timed(Stage::Script, self.writer.write_script(&run.news_summary))
            .await
            .map_err(|e| (Stage::Script, e))?;
        run.dialogue = ScriptParser::parse(&raw);
        run.script_raw = raw;
        if run.dialogue.is_empty() {
            warn!(run_id = %run.id, "script has no parseable dialogue lines");
        }
        info!(run_id = %run.id, lines = run.dialogue.len(), "script generated");
        run.advance(RunState::ScriptGenerated);

        // Metadata
        let raw = timed(Stage::Metadata, self.writer.write_metadata(&run.script_raw))
            .await
            .map_err(|e| (Stage::Metadata, e))?;
        run.metadata = MetadataParser::parse(&raw);
        if run.metadata.title.is_empty() {
            warn!(run_id = %run.id, "metadata has no title");
        }
        info!(run_id = %run.id, title = %run.metadata.title, tags = run.metadata.tags.len(), "metadata generated");
        run.advance(RunState::MetadataGenerated);

        Ok(())
    }

    async fn run_optional(&self, run: &mut PipelineRun) {
        if let Err(e) = tokio::fs::create_dir_all(&run.work_dir).await {
            warn!(run_id = %run.id, error = ?e, dir = %run.work_dir.display(), "cannot create work dir");
            for stage in [Stage::Audio, Stage::Video, Stage::Thumbnail, Stage::Upload] {
                note_skip(run, stage, "work dir unavailable");
            }
            return;
        }

        // Audio
        let attempt = match self.optional.audio.get() {
            None => Attempt::Skipped("not configured"),
            Some(_) if run.dialogue.is_empty() => Attempt::Skipped("no dialogue lines"),
            Some(r) => Attempt::Ran(timed(Stage::Audio, r.render(&run.dialogue, &run.work_dir)).await),
        };
        if let Some(track) = settle(run, Stage::Audio, RunState::AudioGenerated, attempt) {
            run.artifacts.audio = Some(track.path);
            run.artifacts.captions = track.captions;
        }

        // Video
        let attempt = match (self.optional.video.get(), run.artifacts.audio.as_deref()) {
            (None, _) => Attempt::Skipped("not configured"),
            (Some(_), None) => Attempt::Skipped("no audio"),
            (Some(r), Some(audio)) => Attempt::Ran(
                timed(
                    Stage::Video,
                    r.render(audio, &run.artifacts.captions, &run.work_dir),
                )
                .await,
            ),
        };
        run.artifacts.video = settle(run, Stage::Video, RunState::VideoGenerated, attempt);

        // Thumbnail
        let attempt = match (self.optional.thumbnail.get(), run.artifacts.video.is_some()) {
            (None, _) => Attempt::Skipped("not configured"),
            (Some(_), false) => Attempt::Skipped("no video"),
            (Some(r), true) => Attempt::Ran(
                timed(Stage::Thumbnail, r.render(&run.metadata.title, &run.work_dir)).await,
            ),
        };
        run.artifacts.thumbnail =
            settle(run, Stage::Thumbnail, RunState::ThumbnailGenerated, attempt);

        // Upload
        let attempt = match (self.optional.publisher.get(), run.artifacts.video.as_deref()) {
            (None, _) => Attempt::Skipped("not configured"),
            (Some(_), None) => Attempt::Skipped("no video"),
            (Some(p), Some(video)) => {
                let req = UploadRequest {
                    video,
                    title: &run.metadata.title,
                    description: &run.metadata.description,
                    tags: &run.metadata.tags,
                    thumbnail: run.artifacts.thumbnail.as_deref(),
                };
                Attempt::Ran(timed(Stage::Upload, p.upload(req)).await)
            }
        };
        run.artifacts.published = settle(run, Stage::Upload, RunState::Uploaded, attempt);
    }

    async fn fail(&self, mut run: PipelineRun, stage: Stage, e: anyhow::Error) -> PipelineError {
        run.advance(RunState::Failed);
        counter!("pipeline_runs_total", "outcome" => "failed").increment(1);
        error!(run_id = %run.id, stage = %stage, error = ?e, "pipeline failed");
        self.notifier.failed(stage.label(), &format!("{e:#}")).await;
        PipelineError {
            stage,
            run: Box::new(run),
            source: e,
        }
    }
}

fn note_skip(run: &mut PipelineRun, stage: Stage, reason: &str) {
    info!(run_id = %run.id, stage = %stage, reason, "stage skipped");
    counter!("pipeline_stage_skipped_total", "stage" => stage.label()).increment(1);
    run.skip(stage);
}

/// Record an optional stage outcome; errors degrade to a skip.
fn settle<T>(run: &mut PipelineRun, stage: Stage, reached: RunState, attempt: Attempt<T>) -> Option<T> {
    match attempt {
        Attempt::Skipped(reason) => {
            note_skip(run, stage, reason);
            None
        }
        Attempt::Ran(Ok(v)) => {
            run.advance(reached);
            Some(v)
        }
        Attempt::Ran(Err(e)) => {
            warn!(run_id = %run.id, stage = %stage, error = ?e, "optional stage failed");
            note_skip(run, stage, "stage error");
            None
        }
    }
}
