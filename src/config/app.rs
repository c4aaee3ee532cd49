// src/config/app.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ingest::types::Region;

pub const ENV_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://youtube.com/watch?v=dummy";

/// Marker meaning "read this secret from the environment".
const ENV_MARKER: &str = "ENV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub line: LineConfig,
    pub tts: TtsConfig,
    pub video: VideoConfig,
    pub thumbnail: ThumbnailConfig,
    pub youtube: YouTubeConfig,
    pub email: EmailConfig,
    /// Prompt templates; embedded defaults when absent.
    pub prompts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run audio, video, thumbnail and upload after the mandatory stages.
    pub full_pipeline: bool,
    /// Parent of the per-run working directories.
    pub work_dir: PathBuf,
    /// Reported as the video URL when nothing was uploaded.
    pub placeholder_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            full_pipeline: false,
            work_dir: PathBuf::from("output"),
            placeholder_url: DEFAULT_PLACEHOLDER_URL.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub regions: Vec<String>,
    pub max_per_region: usize,
    /// Read `<dir>/<region>.xml` instead of hitting Google News.
    pub fixture_dir: Option<PathBuf>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            regions: Region::ALL.iter().map(|r| r.key().to_string()).collect(),
            max_per_region: 3,
            fixture_dir: None,
        }
    }
}

impl NewsConfig {
    /// Configured regions in `Region::ALL` order; unknown keys are dropped.
    pub fn regions(&self) -> Vec<Region> {
        for key in &self.regions {
            if Region::from_key(key).is_none() {
                tracing::warn!(region = %key, "unknown region in config, ignoring");
            }
        }
        Region::ALL
            .into_iter()
            .filter(|r| self.regions.iter().any(|k| Region::from_key(k) == Some(*r)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "anthropic" | "mock" (case-insensitive)
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub news_max_tokens: u32,
    pub script_max_tokens: u32,
    pub metadata_max_tokens: u32,
    /// How much of the script (in chars) goes into the metadata prompt.
    pub metadata_script_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            model: "claude-3-5-sonnet-20241022".into(),
            api_key: ENV_MARKER.into(),
            base_url: "https://api.anthropic.com".into(),
            timeout_secs: 180,
            news_max_tokens: 2000,
            script_max_tokens: 8000,
            metadata_max_tokens: 1000,
            metadata_script_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub channel_secret: String,
    pub access_token: String,
    pub api_base: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: ENV_MARKER.into(),
            access_token: ENV_MARKER.into(),
            api_base: "https://api.line.me".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub api_key: String,
    pub api_base: String,
    pub model_id: String,
    /// Voice used for speakers missing from `voices`.
    pub default_voice: String,
    /// Speaker name (verbatim from the script) to voice id.
    pub voices: BTreeMap<String, String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: ENV_MARKER.into(),
            api_base: "https://api.elevenlabs.io".into(),
            model_id: "eleven_multilingual_v2".into(),
            default_voice: "21m00Tcm4TlvDq8ikWAM".into(),
            voices: BTreeMap::new(),
        }
    }
}

impl TtsConfig {
    pub fn voice_for(&self, speaker: &str) -> &str {
        self.voices
            .get(speaker)
            .map(String::as_str)
            .unwrap_or(&self.default_voice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub ffmpeg: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// ffmpeg colour syntax, e.g. `0x1e1e32` or `navy`.
    pub background_color: String,
    pub background_image: Option<PathBuf>,
    /// Burn the dialogue captions into the picture.
    pub subtitles: bool,
    pub subtitle_font_size: u32,
    pub font_file: Option<PathBuf>,
    /// Looped under the dialogue when the file exists.
    pub bgm_file: Option<PathBuf>,
    pub bgm_volume: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            width: 1920,
            height: 1080,
            fps: 30,
            background_color: "0x1e1e32".into(),
            background_image: None,
            subtitles: true,
            subtitle_font_size: 40,
            font_file: None,
            bgm_file: None,
            bgm_volume: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub text_color: String,
    pub font_size: u32,
    /// Needed for CJK titles on most systems.
    pub font_file: Option<PathBuf>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background_color: "0x1e1e32".into(),
            text_color: "white".into(),
            font_size: 72,
            font_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// 25 = News & Politics
    pub category_id: String,
    /// "public" | "private" | "unlisted"
    pub privacy_status: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            client_id: ENV_MARKER.into(),
            client_secret: ENV_MARKER.into(),
            refresh_token: ENV_MARKER.into(),
            category_id: "25".into(),
            privacy_status: "public".into(),
        }
    }
}

impl YouTubeConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.refresh_token.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from: String,
    /// Used when the recipient passed to the sink is not an address.
    pub to: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_user: String::new(),
            smtp_pass: ENV_MARKER.into(),
            from: String::new(),
            to: String::new(),
        }
    }
}

impl AppConfig {
    /// Load using env var + fallbacks, then resolve `"ENV"` secrets:
    /// 1) $APP_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(&p)?,
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from_file(default)?
                } else {
                    tracing::info!("no config file found, using defaults");
                    Self::default()
                }
            }
        };
        cfg.resolve_secrets(|name| env::var(name).ok());
        Ok(cfg)
    }

    /// Parse a TOML file. Secrets are left unresolved.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.llm.provider = cfg.llm.provider.trim().to_lowercase();
        if cfg.news.max_per_region == 0 {
            cfg.news.max_per_region = NewsConfig::default().max_per_region;
        }
        Ok(cfg)
    }

    /// Replace every secret equal to `"ENV"` (any case) with `lookup(VAR)`,
    /// or an empty string when the variable is unset.
    pub fn resolve_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets: [(&mut String, &str); 8] = [
            (&mut self.llm.api_key, "ANTHROPIC_API_KEY"),
            (&mut self.line.channel_secret, "LINE_CHANNEL_SECRET"),
            (&mut self.line.access_token, "LINE_CHANNEL_ACCESS_TOKEN"),
            (&mut self.tts.api_key, "ELEVENLABS_API_KEY"),
            (&mut self.youtube.client_id, "YOUTUBE_CLIENT_ID"),
            (&mut self.youtube.client_secret, "YOUTUBE_CLIENT_SECRET"),
            (&mut self.youtube.refresh_token, "YOUTUBE_REFRESH_TOKEN"),
            (&mut self.email.smtp_pass, "SMTP_PASS"),
        ];
        for (slot, var) in secrets {
            if slot.trim().eq_ignore_ascii_case(ENV_MARKER) {
                *slot = lookup(var).unwrap_or_default();
            }
        }
    }

    /// Names of required settings that are empty. Not fatal: callers log it
    /// and features depending on them stay off.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.llm.provider == "anthropic" && self.llm.api_key.is_empty() {
            missing.push("ANTHROPIC_API_KEY");
        }
        if self.line.channel_secret.is_empty() {
            missing.push("LINE_CHANNEL_SECRET");
        }
        if self.line.access_token.is_empty() {
            missing.push("LINE_CHANNEL_ACCESS_TOKEN");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert!(!cfg.pipeline.full_pipeline);
        assert_eq!(cfg.news.max_per_region, 3);
        assert_eq!(cfg.news.regions(), Region::ALL.to_vec());
        assert_eq!(cfg.llm.script_max_tokens, 8000);
        assert_eq!(cfg.pipeline.placeholder_url, DEFAULT_PLACEHOLDER_URL);
    }

    #[test]
    fn env_marker_resolved_through_lookup() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[llm]
api_key = "env"
[line]
channel_secret = "literal-secret"
"#,
        )
        .unwrap();
        let vars: HashMap<&str, &str> =
            [("ANTHROPIC_API_KEY", "sk-test"), ("LINE_CHANNEL_ACCESS_TOKEN", "tok")].into();
        cfg.resolve_secrets(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.llm.api_key, "sk-test");
        assert_eq!(cfg.line.channel_secret, "literal-secret");
        assert_eq!(cfg.line.access_token, "tok");
        assert_eq!(cfg.youtube.refresh_token, "");
        assert!(!cfg.youtube.is_configured());
    }

    #[test]
    fn validate_lists_missing() {
        let mut cfg = AppConfig::default();
        cfg.resolve_secrets(|_| None);
        assert_eq!(
            cfg.validate(),
            vec!["ANTHROPIC_API_KEY", "LINE_CHANNEL_SECRET", "LINE_CHANNEL_ACCESS_TOKEN"]
        );
        cfg.llm.provider = "mock".into();
        assert!(!cfg.validate().contains(&"ANTHROPIC_API_KEY"));
    }

    #[test]
    fn regions_keep_fixed_order_and_drop_unknown() {
        let cfg = AppConfig::from_toml_str(
            r#"
[news]
regions = ["china", "eu", "japan"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.news.regions(), vec![Region::Japan, Region::China]);
    }

    #[test]
    fn voice_lookup_falls_back_to_default() {
        let mut tts = TtsConfig::default();
        tts.voices.insert("アナ".into(), "v-ana".into());
        assert_eq!(tts.voice_for("アナ"), "v-ana");
        assert_eq!(tts.voice_for("ゲスト"), tts.default_voice);
    }
}
