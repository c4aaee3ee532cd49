// tests/pipeline_orchestrator.rs
//
// End-to-end orchestrator runs with in-process stubs for every collaborator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use daily_econ_shorts::config::Prompts;
use daily_econ_shorts::generate::{Budgets, MockGenerator, TextGenerator, Writer};
use daily_econ_shorts::ingest::types::{NewsItem, NewsSource, Region};
use daily_econ_shorts::ingest::NewsAggregator;
use daily_econ_shorts::model::{Caption, DialogueLine, Published, RunState, Stage};
use daily_econ_shorts::notify::{NotificationSink, RunNotifier};
use daily_econ_shorts::pipeline::{
    AudioRenderer, AudioTrack, OptionalStages, PipelineOrchestrator, PipelineSettings, Publisher,
    ThumbnailRenderer, UploadRequest, VideoRenderer,
};

const SUMMARY: &str = "## 日本\n- 日銀が金利据え置き";
const SCRIPT: &str = "アナ: おはようございます。\n解説: 日銀は金利を据え置きました。";
const METADATA: &str = "タイトル: 日銀据え置き\n説明:\n1分で解説\nタグ: 経済, 日銀";

struct OneItemPerRegion;

#[async_trait]
impl NewsSource for OneItemPerRegion {
    async fn fetch(&self, region: Region, _max: usize) -> Result<Vec<NewsItem>> {
        Ok(vec![NewsItem {
            title: format!("{} headline", region.label()),
            link: "https://news.google.com/a".into(),
            published: "Mon, 01 Sep 2025 09:00:00 GMT".into(),
            summary: String::new(),
            source: "Google News".into(),
            region,
        }])
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Succeeds for the news summary, fails on the script call.
struct FailsOnScript {
    calls: Mutex<u32>,
}

#[async_trait]
impl TextGenerator for FailsOnScript {
    async fn complete(&self, _prompt: &str, _max: u32) -> Result<String> {
        let mut calls = self.calls.lock();
        *calls += 1;
        match *calls {
            1 => Ok(SUMMARY.to_string()),
            _ => Err(anyhow!("model overloaded")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        self.sent.lock().push((recipient.into(), message.into()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct StubAudio;

#[async_trait]
impl AudioRenderer for StubAudio {
    async fn render(&self, lines: &[DialogueLine], work_dir: &Path) -> Result<AudioTrack> {
        assert_eq!(lines.len(), 2);
        let path = work_dir.join("dialogue.mp3");
        tokio::fs::write(&path, b"mp3").await?;
        let captions = lines
            .iter()
            .zip(0u64..)
            .map(|(line, i)| Caption {
                text: line.text.clone(),
                start_ms: i * 1000,
                end_ms: (i + 1) * 1000,
            })
            .collect();
        Ok(AudioTrack { path, captions })
    }
}

#[derive(Default)]
struct StubVideo {
    captions: Mutex<Vec<Caption>>,
}

#[async_trait]
impl VideoRenderer for StubVideo {
    async fn render(&self, audio: &Path, captions: &[Caption], work_dir: &Path) -> Result<PathBuf> {
        assert!(audio.exists());
        *self.captions.lock() = captions.to_vec();
        Ok(work_dir.join("video.mp4"))
    }
}

struct BrokenVideo;

#[async_trait]
impl VideoRenderer for BrokenVideo {
    async fn render(&self, _audio: &Path, _captions: &[Caption], _work_dir: &Path) -> Result<PathBuf> {
        bail!("ffmpeg exited with status 1")
    }
}

struct StubThumbnail;

#[async_trait]
impl ThumbnailRenderer for StubThumbnail {
    async fn render(&self, title: &str, work_dir: &Path) -> Result<PathBuf> {
        assert_eq!(title, "日銀据え置き");
        Ok(work_dir.join("thumbnail.jpg"))
    }
}

#[derive(Default)]
struct RecordingPublisher {
    uploads: Mutex<Vec<(String, Vec<String>, bool)>>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn upload(&self, req: UploadRequest<'_>) -> Result<Published> {
        self.uploads
            .lock()
            .push((req.title.into(), req.tags.to_vec(), req.thumbnail.is_some()));
        Ok(Published {
            id: "vid123".into(),
            url: "https://www.youtube.com/watch?v=vid123".into(),
        })
    }
}

fn writer(generator: Arc<dyn TextGenerator>) -> Writer {
    let prompts = Prompts::embedded().expect("embedded prompts");
    Writer::new(generator, Arc::new(prompts), Budgets::default())
}

fn happy_writer() -> Writer {
    writer(Arc::new(MockGenerator::new([SUMMARY, SCRIPT, METADATA])))
}

fn settings(full: bool, work_dir: &Path) -> PipelineSettings {
    PipelineSettings {
        full_pipeline: full,
        work_dir: work_dir.to_path_buf(),
        ..PipelineSettings::default()
    }
}

fn orchestrator(writer: Writer, optional: OptionalStages, settings: PipelineSettings) -> PipelineOrchestrator {
    PipelineOrchestrator::new(
        NewsAggregator::new(Arc::new(OneItemPerRegion)),
        writer,
        optional,
        settings,
    )
}

fn all_stages(publisher: Arc<RecordingPublisher>) -> OptionalStages {
    OptionalStages::none()
        .with_audio(Arc::new(StubAudio))
        .with_video(Arc::new(StubVideo::default()))
        .with_thumbnail(Arc::new(StubThumbnail))
        .with_publisher(publisher)
}

#[tokio::test]
async fn demo_mode_is_degraded_success_with_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(
        happy_writer(),
        all_stages(Arc::new(RecordingPublisher::default())),
        settings(false, dir.path()),
    )
    .with_notifier(RunNotifier::new(sink.clone(), "U1"));

    let run = orch.run().await.expect("run succeeds");

    assert_eq!(
        run.history,
        vec![
            RunState::Started,
            RunState::NewsFetched,
            RunState::ScriptGenerated,
            RunState::MetadataGenerated,
            RunState::Succeeded,
        ]
    );
    assert!(run.succeeded());
    assert!(run.artifacts.is_empty());
    assert_eq!(run.published_url(), "https://youtube.com/watch?v=dummy");
    assert_eq!(run.news.total_items(), 3);
    assert_eq!(run.dialogue.len(), 2);
    assert_eq!(run.metadata.title, "日銀据え置き");
    assert_eq!(run.metadata.tags, vec!["経済", "日銀"]);
    // nothing touched the disk
    assert!(!run.work_dir.exists());

    let sent = sink.sent.lock();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(to, _)| to == "U1"));
    assert_eq!(sent[0].1, "🚀 動画生成を開始しました");
    assert_eq!(
        sent[1].1,
        "✅ 動画生成が完了しました！\n\n📹 日銀据え置き\n🔗 https://youtube.com/watch?v=dummy"
    );
}

#[tokio::test]
async fn script_failure_fails_run_and_notifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(
        writer(Arc::new(FailsOnScript { calls: Mutex::new(0) })),
        OptionalStages::none(),
        settings(false, dir.path()),
    )
    .with_notifier(RunNotifier::new(sink.clone(), "U1"));

    let err = orch.run().await.expect_err("script stage must fail");

    assert_eq!(err.stage, Stage::Script);
    assert_eq!(err.run.state, RunState::Failed);
    assert_eq!(
        err.run.history,
        vec![RunState::Started, RunState::NewsFetched, RunState::Failed]
    );
    assert!(format!("{err}").contains("model overloaded"));

    let sent = sink.sent.lock();
    let errors: Vec<_> = sent.iter().filter(|(_, m)| m.starts_with("❌")).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("ステップ: Script"));
    assert!(errors[0].1.contains("model overloaded"));
    assert!(!sent.iter().any(|(_, m)| m.starts_with("✅")));
}

#[tokio::test]
async fn failure_without_sink_still_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        writer(Arc::new(FailsOnScript { calls: Mutex::new(0) })),
        OptionalStages::none(),
        settings(false, dir.path()),
    );
    let err = orch.run().await.unwrap_err();
    assert_eq!(err.run.state, RunState::Failed);
}

#[tokio::test]
async fn full_mode_runs_every_stage_and_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = Arc::new(RecordingPublisher::default());
    let orch = orchestrator(
        happy_writer(),
        all_stages(publisher.clone()),
        settings(true, dir.path()),
    );

    let run = orch.run().await.unwrap();

    assert_eq!(
        run.history,
        vec![
            RunState::Started,
            RunState::NewsFetched,
            RunState::ScriptGenerated,
            RunState::MetadataGenerated,
            RunState::AudioGenerated,
            RunState::VideoGenerated,
            RunState::ThumbnailGenerated,
            RunState::Uploaded,
            RunState::Succeeded,
        ]
    );
    assert!(run.skipped.is_empty());
    assert!(run.work_dir.starts_with(dir.path()));
    assert_eq!(run.artifacts.audio, Some(run.work_dir.join("dialogue.mp3")));
    assert_eq!(run.published_url(), "https://www.youtube.com/watch?v=vid123");

    let uploads = publisher.uploads.lock();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "日銀据え置き");
    assert_eq!(uploads[0].1, vec!["経済", "日銀"]);
    assert!(uploads[0].2, "thumbnail forwarded");
}

#[tokio::test]
async fn missing_audio_skips_everything_downstream() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = Arc::new(RecordingPublisher::default());
    let optional = OptionalStages::none()
        .with_video(Arc::new(StubVideo::default()))
        .with_thumbnail(Arc::new(StubThumbnail))
        .with_publisher(publisher.clone());
    let orch = orchestrator(happy_writer(), optional, settings(true, dir.path()));

    let run = orch.run().await.unwrap();

    assert!(run.succeeded());
    assert_eq!(
        run.skipped,
        vec![Stage::Audio, Stage::Video, Stage::Thumbnail, Stage::Upload]
    );
    assert!(run.artifacts.is_empty());
    assert!(publisher.uploads.lock().is_empty());
    assert_eq!(run.published_url(), "https://youtube.com/watch?v=dummy");
}

#[tokio::test]
async fn optional_stage_error_degrades_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = Arc::new(RecordingPublisher::default());
    let optional = OptionalStages::none()
        .with_audio(Arc::new(StubAudio))
        .with_video(Arc::new(BrokenVideo))
        .with_thumbnail(Arc::new(StubThumbnail))
        .with_publisher(publisher.clone());
    let orch = orchestrator(happy_writer(), optional, settings(true, dir.path()));

    let run = orch.run().await.unwrap();

    assert_eq!(run.state, RunState::Succeeded);
    assert!(run.artifacts.audio.is_some());
    assert!(run.artifacts.video.is_none());
    assert_eq!(
        run.skipped,
        vec![Stage::Video, Stage::Thumbnail, Stage::Upload]
    );
    assert!(run.history.contains(&RunState::AudioGenerated));
    assert!(!run.history.contains(&RunState::VideoGenerated));
    assert!(publisher.uploads.lock().is_empty());
}

#[tokio::test]
async fn concurrent_runs_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        writer(Arc::new(MockGenerator::new([SUMMARY, SCRIPT, METADATA]))),
        OptionalStages::none(),
        settings(false, dir.path()),
    );
    let (a, b) = tokio::join!(orch.run(), orch.run());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn demo_generator_serves_every_run_alike() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(
        writer(Arc::new(MockGenerator::demo())),
        OptionalStages::none(),
        settings(false, dir.path()),
    );

    let first = orch.run().await.unwrap();
    let second = orch.run().await.unwrap();
    let (third, fourth) = tokio::join!(orch.run(), orch.run());

    for run in [&second, &third.unwrap(), &fourth.unwrap()] {
        assert_eq!(run.news_summary, first.news_summary);
        assert_eq!(run.dialogue, first.dialogue);
        assert_eq!(run.metadata, first.metadata);
    }
    assert_eq!(first.dialogue.len(), 5);
    assert_eq!(first.metadata.title, "【1分解説】日銀据え置き・米雇用・中国輸出");
    assert!(first.news_summary.starts_with("## 日本"));
}

#[tokio::test]
async fn audio_captions_reach_the_video_stage() {
    let dir = tempfile::tempdir().unwrap();
    let video = Arc::new(StubVideo::default());
    let optional = OptionalStages::none()
        .with_audio(Arc::new(StubAudio))
        .with_video(video.clone());
    let orch = orchestrator(happy_writer(), optional, settings(true, dir.path()));

    let run = orch.run().await.unwrap();

    assert_eq!(run.artifacts.captions.len(), 2);
    assert_eq!(run.artifacts.captions[1].start_ms, 1000);
    assert_eq!(*video.captions.lock(), run.artifacts.captions);
    assert!(run.artifacts.video.is_some());
}
