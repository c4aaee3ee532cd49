//! Audio/video/thumbnail adapters. Everything except the TTS HTTP call is
//! delegated to an `ffmpeg` binary.

pub mod thumbnail;
pub mod tts;
pub mod video;

use std::ffi::OsString;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

pub use thumbnail::FfmpegThumbnailRenderer;
pub use tts::ElevenLabsTts;
pub use video::FfmpegVideoRenderer;

/// Run ffmpeg to completion; non-zero exit becomes an error with the stderr
/// tail.
pub async fn run_ffmpeg(bin: &Path, args: &[OsString]) -> Result<()> {
    tracing::debug!(bin = %bin.display(), ?args, "ffmpeg");
    let out = Command::new(bin)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("spawning {}", bin.display()))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("ffmpeg exited with {}: {}", out.status, stderr_tail(&stderr, 8));
    }
    Ok(())
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join(" | ")
}

/// Quote a value for an ffmpeg filter option.
pub(crate) fn filter_quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_non_empty_lines() {
        let s = "a\n\nb\nc\n";
        assert_eq!(stderr_tail(s, 2), "b | c");
        assert_eq!(stderr_tail("", 3), "");
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(filter_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let r = run_ffmpeg(Path::new("/nonexistent/ffmpeg-bin"), &[]).await;
        assert!(r.is_err());
    }
}
