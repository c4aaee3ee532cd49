//! Optional stage interfaces and the capability wrapper the orchestrator
//! depends on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Caption, DialogueLine, Published};

/// Rendered dialogue audio plus one caption per spoken line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub captions: Vec<Caption>,
}

#[async_trait]
pub trait AudioRenderer: Send + Sync {
    /// One audio file for the whole dialogue.
    async fn render(&self, lines: &[DialogueLine], work_dir: &Path) -> Result<AudioTrack>;
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// `captions` may be empty; the video is then rendered without subtitles.
    async fn render(&self, audio: &Path, captions: &[Caption], work_dir: &Path)
        -> Result<PathBuf>;
}

#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    async fn render(&self, title: &str, work_dir: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub video: &'a Path,
    pub title: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub thumbnail: Option<&'a Path>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn upload(&self, req: UploadRequest<'_>) -> Result<Published>;
}

/// An optional collaborator that may not be wired up.
pub enum Capability<T: ?Sized> {
    Configured(Arc<T>),
    NotConfigured,
}

impl<T: ?Sized> Capability<T> {
    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            Capability::Configured(inner) => Some(inner),
            Capability::NotConfigured => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Capability::Configured(_))
    }
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        match self {
            Capability::Configured(inner) => Capability::Configured(Arc::clone(inner)),
            Capability::NotConfigured => Capability::NotConfigured,
        }
    }
}

impl<T: ?Sized> Default for Capability<T> {
    fn default() -> Self {
        Capability::NotConfigured
    }
}

impl<T: ?Sized> From<Option<Arc<T>>> for Capability<T> {
    fn from(v: Option<Arc<T>>) -> Self {
        v.map_or(Capability::NotConfigured, Capability::Configured)
    }
}

/// Everything that runs after the metadata stage in full-pipeline mode.
#[derive(Clone, Default)]
pub struct OptionalStages {
    pub audio: Capability<dyn AudioRenderer>,
    pub video: Capability<dyn VideoRenderer>,
    pub thumbnail: Capability<dyn ThumbnailRenderer>,
    pub publisher: Capability<dyn Publisher>,
}

impl OptionalStages {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, r: Arc<dyn AudioRenderer>) -> Self {
        self.audio = Capability::Configured(r);
        self
    }

    pub fn with_video(mut self, r: Arc<dyn VideoRenderer>) -> Self {
        self.video = Capability::Configured(r);
        self
    }

    pub fn with_thumbnail(mut self, r: Arc<dyn ThumbnailRenderer>) -> Self {
        self.thumbnail = Capability::Configured(r);
        self
    }

    pub fn with_publisher(mut self, p: Arc<dyn Publisher>) -> Self {
        self.publisher = Capability::Configured(p);
        self
    }
}
