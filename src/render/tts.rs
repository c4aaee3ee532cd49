use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::run_ffmpeg;
use crate::config::app::TtsConfig;
use crate::model::{Caption, DialogueLine};
use crate::pipeline::{AudioRenderer, AudioTrack};

/// ElevenLabs text-to-speech, one request per dialogue line, joined with
/// ffmpeg's concat demuxer.
pub struct ElevenLabsTts {
    http: reqwest::Client,
    cfg: TtsConfig,
    ffmpeg: PathBuf,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl ElevenLabsTts {
    pub fn new(cfg: &TtsConfig, ffmpeg: impl Into<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building tts http client")?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
            ffmpeg: ffmpeg.into(),
        })
    }

    async fn synthesize(&self, voice: &str, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/v1/text-to-speech/{voice}?output_format=mp3_44100_128",
            self.cfg.api_base.trim_end_matches('/')
        );
        let bytes = self
            .http
            .post(url)
            .header("xi-api-key", &self.cfg.api_key)
            .header("accept", "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.cfg.model_id,
            })
            .send()
            .await
            .context("tts request")?
            .error_for_status()
            .context("tts non-2xx")?
            .bytes()
            .await
            .context("tts body")?;
        Ok(bytes.to_vec())
    }
}

/// Bitrate requested from ElevenLabs (`mp3_44100_128`), in bits per second.
const MP3_BITRATE: u64 = 128_000;

/// Playback length of a constant-bitrate mp3 clip.
pub fn mp3_duration_ms(len_bytes: usize) -> u64 {
    len_bytes as u64 * 8 * 1000 / MP3_BITRATE
}

/// Back-to-back captions for `(text, duration)` clips in playback order.
pub fn captions_for(clips: &[(String, u64)]) -> Vec<Caption> {
    let mut cursor = 0;
    clips
        .iter()
        .map(|(text, duration_ms)| {
            let start_ms = cursor;
            cursor += duration_ms;
            Caption {
                text: text.clone(),
                start_ms,
                end_ms: cursor,
            }
        })
        .collect()
}

/// Body of an ffmpeg concat list. Paths are written by file name only, so
/// the list must sit next to the segments.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| {
            let name = name.to_string_lossy().replace('\'', "'\\''");
            format!("file '{name}'\n")
        })
        .collect()
}

#[async_trait]
impl AudioRenderer for ElevenLabsTts {
    async fn render(&self, lines: &[DialogueLine], work_dir: &Path) -> Result<AudioTrack> {
        let mut segments = Vec::with_capacity(lines.len());
        let mut clips = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            if line.text.trim().is_empty() {
                continue;
            }
            let voice = self.cfg.voice_for(&line.speaker);
            tracing::debug!(idx, speaker = %line.speaker, voice, "synthesizing line");
            let audio = self
                .synthesize(voice, &line.text)
                .await
                .with_context(|| format!("line {idx} ({})", line.speaker))?;
            clips.push((line.text.clone(), mp3_duration_ms(audio.len())));
            let path = work_dir.join(format!("audio_{idx:04}.mp3"));
            tokio::fs::write(&path, audio)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            segments.push(path);
        }
        if segments.is_empty() {
            bail!("no dialogue line has text to speak");
        }

        let list = work_dir.join("audio_list.txt");
        tokio::fs::write(&list, concat_list(&segments))
            .await
            .context("writing concat list")?;

        let out = work_dir.join("dialogue.mp3");
        let args: Vec<OsString> = vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list.into(),
            "-c".into(),
            "copy".into(),
            out.clone().into(),
        ];
        run_ffmpeg(&self.ffmpeg, &args).await.context("concatenating audio")?;
        let captions = captions_for(&clips);
        tracing::info!(
            segments = segments.len(),
            duration_ms = captions.last().map_or(0, |c| c.end_ms),
            path = %out.display(),
            "audio rendered"
        );
        Ok(AudioTrack {
            path: out,
            captions,
        })
    }
}
