use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{filter_quote, run_ffmpeg};
use crate::config::app::ThumbnailConfig;
use crate::pipeline::ThumbnailRenderer;

/// Title text centred on a solid background, written as JPEG.
pub struct FfmpegThumbnailRenderer {
    cfg: ThumbnailConfig,
    ffmpeg: PathBuf,
}

/// Hard-wrap `title` to lines of at most `max_chars` characters, preferring
/// to break at spaces.
pub fn wrap_title(title: &str, max_chars: usize) -> String {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in title.split_whitespace() {
        let sep = usize::from(!cur.is_empty());
        if cur.chars().count() + sep + word.chars().count() <= max_chars {
            if sep == 1 {
                cur.push(' ');
            }
            cur.push_str(word);
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        // CJK titles arrive as one long "word"
        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(max_chars).peekable();
        while let Some(chunk) = chunks.next() {
            let piece: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(piece);
            } else {
                cur = piece;
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines.join("\n")
}

impl FfmpegThumbnailRenderer {
    pub fn new(cfg: &ThumbnailConfig, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            cfg: cfg.clone(),
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Characters per line that fit in 90% of the width at the font size.
    fn chars_per_line(&self) -> usize {
        let usable = f64::from(self.cfg.width) * 0.9;
        (usable / f64::from(self.cfg.font_size.max(1))).floor() as usize
    }

    pub fn args(&self, text_file: &Path, out: &Path) -> Vec<OsString> {
        let ThumbnailConfig {
            width,
            height,
            font_size,
            ..
        } = self.cfg;
        let mut drawtext = format!(
            "drawtext=textfile={}:fontcolor={}:fontsize={font_size}:line_spacing=12:x=(w-text_w)/2:y=(h-text_h)/2",
            filter_quote(&text_file.to_string_lossy()),
            self.cfg.text_color,
        );
        if let Some(font) = &self.cfg.font_file {
            drawtext.push_str(&format!(":fontfile={}", filter_quote(&font.to_string_lossy())));
        }
        vec![
            "-y".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("color=c={}:s={width}x{height}", self.cfg.background_color).into(),
            "-frames:v".into(),
            "1".into(),
            "-vf".into(),
            drawtext.into(),
            "-q:v".into(),
            "2".into(),
            out.into(),
        ]
    }
}

#[async_trait]
impl ThumbnailRenderer for FfmpegThumbnailRenderer {
    async fn render(&self, title: &str, work_dir: &Path) -> Result<PathBuf> {
        let text_file = work_dir.join("thumbnail_title.txt");
        tokio::fs::write(&text_file, wrap_title(title, self.chars_per_line()))
            .await
            .context("writing thumbnail text")?;
        let out = work_dir.join("thumbnail.jpg");
        run_ffmpeg(&self.ffmpeg, &self.args(&text_file, &out))
            .await
            .context("rendering thumbnail")?;
        tracing::info!(path = %out.display(), "thumbnail rendered");
        Ok(out)
    }
}
