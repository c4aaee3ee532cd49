// src/bootstrap.rs
//! Wires concrete adapters from an `AppConfig`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{AppConfig, Prompts};
use crate::generate::{build_generator, Budgets, Writer};
use crate::ingest::providers::GoogleNewsRss;
use crate::ingest::types::{NewsSource, Region};
use crate::ingest::NewsAggregator;
use crate::notify::{DynSink, EmailNotifier, LineMessaging};
use crate::pipeline::{OptionalStages, PipelineOrchestrator, PipelineSettings};
use crate::publish::YouTubePublisher;
use crate::render::{ElevenLabsTts, FfmpegThumbnailRenderer, FfmpegVideoRenderer};

/// Log missing secrets once at startup.
pub fn report_config(cfg: &AppConfig) {
    let missing = cfg.validate();
    if missing.is_empty() {
        info!(
            provider = %cfg.llm.provider,
            full_pipeline = cfg.pipeline.full_pipeline,
            "configuration validated"
        );
    } else {
        warn!(missing = ?missing, "configuration incomplete; some features will not work");
    }
}

/// News source: fixture files when `news.fixture_dir` is set, live feeds
/// otherwise.
pub fn build_news_source(cfg: &AppConfig) -> Result<Arc<dyn NewsSource>> {
    match &cfg.news.fixture_dir {
        Some(dir) => {
            let mut fixtures = HashMap::new();
            for region in Region::ALL {
                let path = dir.join(format!("{}.xml", region.key()));
                match std::fs::read_to_string(&path) {
                    Ok(xml) => {
                        fixtures.insert(region, xml);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "news fixture missing"),
                }
            }
            Ok(Arc::new(GoogleNewsRss::from_fixtures(fixtures)))
        }
        None => Ok(Arc::new(GoogleNewsRss::from_default_urls()?)),
    }
}

/// Optional stages for full-pipeline mode. Capabilities whose credentials
/// are missing stay `NotConfigured`.
pub fn build_optional_stages(cfg: &AppConfig) -> Result<OptionalStages> {
    let mut stages = OptionalStages::none();
    if !cfg.pipeline.full_pipeline {
        return Ok(stages);
    }

    if cfg.tts.api_key.is_empty() {
        warn!("ELEVENLABS_API_KEY missing; audio stage not configured");
    } else {
        stages = stages.with_audio(Arc::new(ElevenLabsTts::new(&cfg.tts, &cfg.video.ffmpeg)?));
    }
    stages = stages
        .with_video(Arc::new(FfmpegVideoRenderer::new(&cfg.video)))
        .with_thumbnail(Arc::new(FfmpegThumbnailRenderer::new(
            &cfg.thumbnail,
            &cfg.video.ffmpeg,
        )));
    if cfg.youtube.is_configured() {
        stages = stages.with_publisher(Arc::new(YouTubePublisher::new(&cfg.youtube)?));
    } else {
        warn!("YouTube credentials missing; upload stage not configured");
    }
    Ok(stages)
}

pub fn build_orchestrator(cfg: &AppConfig) -> Result<PipelineOrchestrator> {
    let prompts = Prompts::load(cfg.prompts_path.as_deref())?;
    let generator = build_generator(&cfg.llm).context("building text generator")?;
    let writer = Writer::new(generator, Arc::new(prompts), Budgets::from(&cfg.llm));
    let news = NewsAggregator::new(build_news_source(cfg)?);
    Ok(PipelineOrchestrator::new(
        news,
        writer,
        build_optional_stages(cfg)?,
        PipelineSettings::from(cfg),
    ))
}

/// Operator notification sink for CLI runs: e-mail when enabled.
pub fn build_email_sink(cfg: &AppConfig) -> Result<Option<DynSink>> {
    if !cfg.email.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(EmailNotifier::new(&cfg.email)?)))
}

pub fn build_line(cfg: &AppConfig) -> Result<Arc<LineMessaging>> {
    Ok(Arc::new(LineMessaging::new(&cfg.line)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_stages_empty_unless_full_pipeline() {
        let cfg = AppConfig::default();
        let s = build_optional_stages(&cfg).unwrap();
        assert!(!s.video.is_configured());
    }

    #[test]
    fn full_pipeline_without_credentials_has_render_only() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.full_pipeline = true;
        cfg.resolve_secrets(|_| None);
        let s = build_optional_stages(&cfg).unwrap();
        assert!(!s.audio.is_configured());
        assert!(s.video.is_configured());
        assert!(s.thumbnail.is_configured());
        assert!(!s.publisher.is_configured());
    }

    #[test]
    fn fixture_dir_builds_offline_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("japan.xml"),
            "<rss><channel><item><title>t</title></item></channel></rss>",
        )
        .unwrap();
        let mut cfg = AppConfig::default();
        cfg.news.fixture_dir = Some(dir.path().to_path_buf());
        cfg.llm.provider = "mock".into();
        assert!(build_orchestrator(&cfg).is_ok());
    }
}
