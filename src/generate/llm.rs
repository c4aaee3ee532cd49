//! Generative text adapter: provider abstraction + Anthropic client + mock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SCRIPT_HEADING, SUMMARY_HEADING};
use crate::config::app::LlmConfig;

/// Best-effort natural-language completion. No schema guarantee on output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynTextGenerator = Arc<dyn TextGenerator>;

/// Factory: build a generator according to config.
///
/// * `provider = "mock"` returns a `MockGenerator` with canned demo output.
/// * `provider = "anthropic"` requires a resolved API key.
pub fn build_generator(cfg: &LlmConfig) -> Result<DynTextGenerator> {
    match cfg.provider.as_str() {
        "mock" => Ok(Arc::new(MockGenerator::demo())),
        "anthropic" => {
            if cfg.api_key.is_empty() {
                bail!("ANTHROPIC_API_KEY is not set");
            }
            Ok(Arc::new(AnthropicProvider::new(cfg)?))
        }
        other => bail!("Unsupported llm provider in config: {other}"),
    }
}

/// Anthropic Messages API.
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicProvider {
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("daily-econ-shorts/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building anthropic http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/v1/messages", cfg.base_url.trim_end_matches('/')),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextGenerator for AnthropicProvider {
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let req = Req {
            model: &self.model,
            max_tokens: max_output_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&req)
            .send()
            .await
            .context("anthropic request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("anthropic HTTP {status}: {}", body.chars().take(300).collect::<String>());
        }

        let body: Resp = resp.json().await.context("decoding anthropic response")?;
        let text = body
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            bail!("anthropic returned an empty completion");
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

/// Replays queued responses in order; the last one repeats once the queue
/// runs dry. Routed responses answer any prompt containing their marker
/// without touching the queue. Used for offline demo runs and tests.
pub struct MockGenerator {
    routes: Vec<(String, String)>,
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routes: Vec::new(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
        }
    }

    /// Answer prompts containing `marker` with `response`. First match wins.
    pub fn route(mut self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.routes.push((marker.into(), response.into()));
        self
    }

    /// News summary, script and metadata for demo runs. Every run gets the
    /// same three answers, however many runs share the generator.
    pub fn demo() -> Self {
        Self::new([
            "## 日本\n- 日銀が政策金利を据え置き\n## 米国\n- 雇用統計が市場予想を上回る\n## 中国\n- 輸出が3か月ぶりに増加",
        ])
        .route(
            SCRIPT_HEADING,
            "タイトル: 【1分解説】日銀据え置き・米雇用・中国輸出\n説明:\n今日の主要経済ニュースを1分で解説します。\n日本・米国・中国の動きをチェック。\nタグ: 経済, ニュース, 日銀, 米国, 中国",
        )
        .route(
            SUMMARY_HEADING,
            "# オープニング\nアナ: おはようございます。今日の経済ニュースです。\n解説: 日銀は金利を据え置きました。\nアナ: 米国の雇用は強いですね。\n解説: 中国の輸出も持ち直しています。\nアナ: チャンネル登録もお願いします！",
        )
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, prompt: &str, _max_output_tokens: u32) -> Result<String> {
        if let Some((_, response)) = self.routes.iter().find(|(m, _)| prompt.contains(m.as_str())) {
            return Ok(response.clone());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow!("mock generator lock poisoned"))?
            .pop_front();
        let mut last = self
            .last
            .lock()
            .map_err(|_| anyhow!("mock generator lock poisoned"))?;
        match next {
            Some(s) => {
                *last = Some(s.clone());
                Ok(s)
            }
            None => last.clone().ok_or_else(|| anyhow!("mock generator has no responses")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_then_repeats_last() {
        let g = MockGenerator::new(["a", "b"]);
        assert_eq!(g.complete("x", 10).await.unwrap(), "a");
        assert_eq!(g.complete("x", 10).await.unwrap(), "b");
        assert_eq!(g.complete("x", 10).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn routes_answer_by_marker_without_consuming_queue() {
        let g = MockGenerator::new(["fallback"]).route("## 台本:", "meta");
        assert_eq!(g.complete("T\n\n## 台本:\nA: hi...", 10).await.unwrap(), "meta");
        assert_eq!(g.complete("news", 10).await.unwrap(), "fallback");
        assert_eq!(g.complete("T\n\n## 台本:\nB: yo...", 10).await.unwrap(), "meta");
    }

    #[tokio::test]
    async fn empty_mock_errors() {
        let g = MockGenerator::new(Vec::<String>::new());
        assert!(g.complete("x", 10).await.is_err());
    }

    #[test]
    fn factory_rejects_missing_key_and_unknown_provider() {
        let mut cfg = LlmConfig {
            api_key: String::new(),
            ..LlmConfig::default()
        };
        assert!(build_generator(&cfg).is_err());
        cfg.provider = "mock".into();
        assert_eq!(build_generator(&cfg).unwrap().provider_name(), "mock");
        cfg.provider = "gpt-9".into();
        assert!(build_generator(&cfg).is_err());
    }
}
