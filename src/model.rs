//! # Run model
//! Data threaded between pipeline stages. Everything here is created fresh for
//! one orchestrator invocation and dropped once the run has been reported.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ingest::types::NewsBundle;

/// One spoken utterance of the generated dialogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Publishing metadata derived from the script.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    /// Order preserved, duplicates and empty entries kept as generated.
    pub tags: Vec<String>,
}

/// Conceptual pipeline stages, used for logging and error reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stage {
    News,
    Script,
    Metadata,
    Audio,
    Video,
    Thumbnail,
    Upload,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::News => "News",
            Stage::Script => "Script",
            Stage::Metadata => "Metadata",
            Stage::Audio => "Audio",
            Stage::Video => "Video",
            Stage::Thumbnail => "Thumbnail",
            Stage::Upload => "Upload",
        }
    }

    pub fn is_mandatory(self) -> bool {
        matches!(self, Stage::News | Stage::Script | Stage::Metadata)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orchestrator state machine. Bracketed states in the happy path are only
/// visited in full-pipeline mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Started,
    NewsFetched,
    ScriptGenerated,
    MetadataGenerated,
    AudioGenerated,
    VideoGenerated,
    ThumbnailGenerated,
    Uploaded,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Published {
    pub id: String,
    pub url: String,
}

/// One on-screen caption, timed against the dialogue audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Files and links produced by the optional stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifacts {
    pub audio: Option<PathBuf>,
    /// Caption timings for the audio; empty when no audio was rendered.
    pub captions: Vec<Caption>,
    pub video: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub published: Option<Published>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.video.is_none()
            && self.thumbnail.is_none()
            && self.published.is_none()
    }
}

/// Aggregate for one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: String,
    pub work_dir: PathBuf,
    pub state: RunState,
    /// Every state entered, in order, starting with `Started`.
    pub history: Vec<RunState>,
    pub news: NewsBundle,
    pub news_document: String,
    pub news_summary: String,
    pub script_raw: String,
    pub dialogue: Vec<DialogueLine>,
    pub metadata: Metadata,
    pub artifacts: Artifacts,
    pub skipped: Vec<Stage>,
    placeholder_url: String,
}

impl PipelineRun {
    pub(crate) fn start(id: String, work_dir: PathBuf, placeholder_url: String) -> Self {
        Self {
            id,
            work_dir,
            state: RunState::Started,
            history: vec![RunState::Started],
            news: NewsBundle::default(),
            news_document: String::new(),
            news_summary: String::new(),
            script_raw: String::new(),
            dialogue: Vec::new(),
            metadata: Metadata::default(),
            artifacts: Artifacts::default(),
            skipped: Vec::new(),
            placeholder_url,
        }
    }

    pub(crate) fn advance(&mut self, next: RunState) {
        tracing::debug!(run_id = %self.id, from = ?self.state, to = ?next, "run state");
        self.state = next;
        self.history.push(next);
    }

    pub(crate) fn skip(&mut self, stage: Stage) {
        self.skipped.push(stage);
    }

    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Published URL, or the placeholder when nothing was uploaded.
    pub fn published_url(&self) -> &str {
        self.artifacts
            .published
            .as_ref()
            .map(|p| p.url.as_str())
            .unwrap_or(&self.placeholder_url)
    }

    /// True when the run succeeded without visiting any optional stage.
    pub fn is_degraded(&self) -> bool {
        self.succeeded() && self.artifacts.is_empty()
    }
}
