// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::ingest::types::{NewsBundle, NewsSource, Region};

/// Summaries longer than this are cut (in chars).
pub const SUMMARY_MAX_CHARS: usize = 500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_items_total", "News items kept per region.");
        describe_counter!(
            "news_region_failures_total",
            "Regions that yielded no items (fetch error or empty feed)."
        );
        describe_histogram!("news_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, unify quotes, collapse
/// whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. decoded &nbsp;)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }

    out
}

/// Collects per-region news from a single `NewsSource`.
#[derive(Clone)]
pub struct NewsAggregator {
    source: Arc<dyn NewsSource>,
}

impl NewsAggregator {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self { source }
    }

    /// Fetch up to `max_per_region` items per region, sequentially, in feed
    /// order. Never fails: an unreachable or empty region becomes an empty
    /// list and a warning.
    pub async fn fetch(&self, regions: &[Region], max_per_region: usize) -> NewsBundle {
        ensure_metrics_described();

        let mut bundle = NewsBundle::default();
        for &region in regions {
            let items = match self.source.fetch(region, max_per_region).await {
                Ok(mut v) => {
                    v.truncate(max_per_region);
                    if v.is_empty() {
                        tracing::warn!(
                            target: "ingest",
                            region = region.key(),
                            provider = self.source.name(),
                            "feed returned no items"
                        );
                        counter!("news_region_failures_total", "region" => region.key())
                            .increment(1);
                    }
                    v
                }
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        error = ?e,
                        region = region.key(),
                        provider = self.source.name(),
                        "news fetch failed, continuing without region"
                    );
                    counter!("news_region_failures_total", "region" => region.key()).increment(1);
                    Vec::new()
                }
            };
            counter!("news_items_total", "region" => region.key()).increment(items.len() as u64);
            tracing::info!(target: "ingest", region = region.key(), items = items.len(), "region fetched");
            bundle.by_region.insert(region, items);
        }
        bundle
    }

    /// Render the bundle for the generative model.
    pub fn format(bundle: &NewsBundle) -> String {
        bundle.format()
    }
}
