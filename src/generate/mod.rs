//! Generation steps: prompt assembly + one completion call each.

pub mod llm;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::app::LlmConfig;
use crate::config::Prompts;
pub use llm::{build_generator, DynTextGenerator, MockGenerator, TextGenerator};

/// Token budgets and truncation for the three calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub news: u32,
    pub script: u32,
    pub metadata: u32,
    pub metadata_script_chars: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for Budgets {
    fn from(cfg: &LlmConfig) -> Self {
        Self {
            news: cfg.news_max_tokens,
            script: cfg.script_max_tokens,
            metadata: cfg.metadata_max_tokens,
            metadata_script_chars: cfg.metadata_script_chars,
        }
    }
}

/// Wraps the generator with the prompt templates.
#[derive(Clone)]
pub struct Writer {
    generator: DynTextGenerator,
    prompts: Arc<Prompts>,
    budgets: Budgets,
}

impl Writer {
    pub fn new(generator: DynTextGenerator, prompts: Arc<Prompts>, budgets: Budgets) -> Self {
        Self {
            generator,
            prompts,
            budgets,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator.provider_name()
    }

    /// Condense the formatted news document.
    pub async fn summarize_news(&self, news_document: &str) -> Result<String> {
        let prompt = news_prompt(&self.prompts.news_search, news_document);
        self.generator
            .complete(&prompt, self.budgets.news)
            .await
            .context("news summary generation")
    }

    /// Draft the dialogue script from the news summary.
    pub async fn write_script(&self, news_summary: &str) -> Result<String> {
        let prompt = script_prompt(&self.prompts.script, news_summary);
        self.generator
            .complete(&prompt, self.budgets.script)
            .await
            .context("script generation")
    }

    /// Draft title/description/tags from the script.
    pub async fn write_metadata(&self, script: &str) -> Result<String> {
        let prompt = metadata_prompt(
            &self.prompts.metadata,
            script,
            self.budgets.metadata_script_chars,
        );
        self.generator
            .complete(&prompt, self.budgets.metadata)
            .await
            .context("metadata generation")
    }
}

pub fn news_prompt(template: &str, news_document: &str) -> String {
    format!("{template}\n\n{news_document}")
}

/// Section heading that introduces the news summary in the script prompt.
pub const SUMMARY_HEADING: &str = "## ニュース要約:";
/// Section heading that introduces the script in the metadata prompt.
pub const SCRIPT_HEADING: &str = "## 台本:";

pub fn script_prompt(template: &str, news_summary: &str) -> String {
    format!("{template}\n\n{SUMMARY_HEADING}\n{news_summary}")
}

/// The script is cut to `max_chars` characters and always followed by `...`.
pub fn metadata_prompt(template: &str, script: &str, max_chars: usize) -> String {
    let head: String = script.chars().take(max_chars).collect();
    format!("{template}\n\n{SCRIPT_HEADING}\n{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_prompt_truncates_by_chars() {
        let script = "あいうえお";
        let p = metadata_prompt("T", script, 3);
        assert_eq!(p, "T\n\n## 台本:\nあいう...");
    }

    #[test]
    fn script_prompt_appends_summary_section() {
        assert_eq!(
            script_prompt("T", "S"),
            "T\n\n## ニュース要約:\nS"
        );
    }

    #[tokio::test]
    async fn writer_calls_generator_in_stage_order() {
        let gen = Arc::new(MockGenerator::new(["summary", "A: hi", "タイトル: t"]));
        let prompts = Arc::new(Prompts::embedded().unwrap());
        let w = Writer::new(gen, prompts, Budgets::default());
        assert_eq!(w.summarize_news("doc").await.unwrap(), "summary");
        assert_eq!(w.write_script("summary").await.unwrap(), "A: hi");
        assert_eq!(w.write_metadata("A: hi").await.unwrap(), "タイトル: t");
        assert_eq!(w.provider_name(), "mock");
    }
}
