use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::thumbnail::wrap_title;
use super::{filter_quote, run_ffmpeg};
use crate::config::app::VideoConfig;
use crate::model::Caption;
use crate::pipeline::VideoRenderer;

/// Still background (solid colour or image) under the dialogue audio, with
/// timed captions and optional looped background music.
pub struct FfmpegVideoRenderer {
    cfg: VideoConfig,
}

/// A caption whose text has been written to `text_file` for `drawtext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCue {
    pub text_file: PathBuf,
    pub start_ms: u64,
    pub end_ms: u64,
}

fn secs(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

impl FfmpegVideoRenderer {
    pub fn new(cfg: &VideoConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    /// Caption width is the frame minus a 50px margin each side.
    fn chars_per_line(&self) -> usize {
        let usable = self.cfg.width.saturating_sub(100);
        (usable / self.cfg.subtitle_font_size.max(1)).max(1) as usize
    }

    fn bgm(&self) -> Option<&Path> {
        self.cfg.bgm_file.as_deref().filter(|p| p.exists())
    }

    fn drawtext(&self, cue: &CaptionCue) -> String {
        let mut f = format!(
            "drawtext=textfile={}:fontcolor=white:fontsize={}:box=1:boxcolor=black@0.6:boxborderw=12:x=(w-text_w)/2:y=h-150-text_h/2:enable='between(t,{},{})'",
            filter_quote(&cue.text_file.to_string_lossy()),
            self.cfg.subtitle_font_size,
            secs(cue.start_ms),
            secs(cue.end_ms),
        );
        if let Some(font) = &self.cfg.font_file {
            f.push_str(&format!(":fontfile={}", filter_quote(&font.to_string_lossy())));
        }
        f
    }

    /// `-filter_complex` graph. Inputs: 0 background, 1 dialogue, 2 music.
    pub fn filter_graph(&self, cues: &[CaptionCue], with_bgm: bool) -> String {
        let VideoConfig { width, height, .. } = self.cfg;
        let mut video = format!(
            "[0:v]scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
        );
        for cue in cues {
            video.push(',');
            video.push_str(&self.drawtext(cue));
        }
        video.push_str("[v]");
        if with_bgm {
            video.push_str(&format!(
                ";[2:a]volume={}[bgm];[1:a][bgm]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[a]",
                self.cfg.bgm_volume
            ));
        }
        video
    }

    /// Arguments for one encode; output length follows the audio.
    pub fn args(&self, audio: &Path, cues: &[CaptionCue], out: &Path) -> Vec<OsString> {
        let VideoConfig {
            width,
            height,
            fps,
            ..
        } = self.cfg;
        let input: Vec<OsString> = match self.cfg.background_image.as_deref().filter(|p| p.exists()) {
            Some(image) => vec![
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                fps.to_string().into(),
                "-i".into(),
                image.into(),
            ],
            None => vec![
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!(
                    "color=c={}:s={width}x{height}:r={fps}",
                    self.cfg.background_color
                )
                .into(),
            ],
        };
        let bgm = self.bgm();
        let music: Vec<OsString> = match bgm {
            Some(path) => vec!["-stream_loop".into(), "-1".into(), "-i".into(), path.into()],
            None => Vec::new(),
        };
        let audio_map = if bgm.is_some() { "[a]" } else { "1:a" };
        let encode: Vec<OsString> = vec![
            "-filter_complex".into(),
            self.filter_graph(cues, bgm.is_some()).into(),
            "-map".into(),
            "[v]".into(),
            "-map".into(),
            audio_map.into(),
            "-c:v".into(),
            "libx264".into(),
            "-tune".into(),
            "stillimage".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-shortest".into(),
            out.into(),
        ];
        let mut args: Vec<OsString> = vec!["-y".into()];
        args.extend(input);
        args.push("-i".into());
        args.push(audio.into());
        args.extend(music);
        args.extend(encode);
        args
    }

    /// Writes one wrapped text file per non-blank caption.
    async fn write_cues(&self, captions: &[Caption], work_dir: &Path) -> Result<Vec<CaptionCue>> {
        if !self.cfg.subtitles {
            return Ok(Vec::new());
        }
        let width = self.chars_per_line();
        let mut cues = Vec::with_capacity(captions.len());
        for (idx, caption) in captions.iter().enumerate() {
            if caption.text.trim().is_empty() || caption.end_ms <= caption.start_ms {
                continue;
            }
            let text_file = work_dir.join(format!("caption_{idx:04}.txt"));
            tokio::fs::write(&text_file, wrap_title(&caption.text, width))
                .await
                .with_context(|| format!("writing {}", text_file.display()))?;
            cues.push(CaptionCue {
                text_file,
                start_ms: caption.start_ms,
                end_ms: caption.end_ms,
            });
        }
        Ok(cues)
    }
}

#[async_trait]
impl VideoRenderer for FfmpegVideoRenderer {
    async fn render(&self, audio: &Path, captions: &[Caption], work_dir: &Path) -> Result<PathBuf> {
        let cues = self.write_cues(captions, work_dir).await?;
        let out = work_dir.join("video.mp4");
        run_ffmpeg(&self.cfg.ffmpeg, &self.args(audio, &cues, &out))
            .await
            .context("encoding video")?;
        tracing::info!(
            path = %out.display(),
            captions = cues.len(),
            bgm = self.bgm().is_some(),
            "video rendered"
        );
        Ok(out)
    }
}
