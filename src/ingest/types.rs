// src/ingest/types.rs
use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Economies covered by the daily digest. Declaration order is the order in
/// which regions are rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Japan,
    Us,
    China,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Japan, Region::Us, Region::China];

    /// Config key, e.g. `"japan"`.
    pub fn key(self) -> &'static str {
        match self {
            Region::Japan => "japan",
            Region::Us => "us",
            Region::China => "china",
        }
    }

    /// Short label stored on every `NewsItem`.
    pub fn label(self) -> &'static str {
        match self {
            Region::Japan => "日本",
            Region::Us => "米国",
            Region::China => "中国",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Region::Japan => "🇯🇵 日本経済ニュース",
            Region::Us => "🇺🇸 米国経済ニュース",
            Region::China => "🇨🇳 中国経済ニュース",
        }
    }

    /// Google News RSS feed for this economy.
    pub fn feed_url(self) -> &'static str {
        match self {
            Region::Japan => "https://news.google.com/rss/topics/CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtcGhHZ0pLVUNnQVAB?hl=ja&gl=JP&ceid=JP:ja",
            Region::Us => "https://news.google.com/rss/topics/CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtVnVHZ0pWVXlnQVAB?hl=en-US&gl=US&ceid=US:en",
            // search for "中国経済"
            Region::China => "https://news.google.com/rss/search?q=%E4%B8%AD%E5%9B%BD%E7%B5%8C%E6%B8%88&hl=ja&gl=JP&ceid=JP:ja",
        }
    }

    pub fn from_key(s: &str) -> Option<Region> {
        Region::ALL
            .into_iter()
            .find(|r| r.key().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Publish time exactly as the feed reported it.
    pub published: String,
    pub summary: String,
    pub source: String,
    pub region: Region,
}

/// News grouped by region. Regions that failed to fetch are present with an
/// empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsBundle {
    pub by_region: BTreeMap<Region, Vec<NewsItem>>,
}

impl NewsBundle {
    pub fn items(&self, region: Region) -> &[NewsItem] {
        self.by_region
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.by_region.values().map(Vec::len).sum()
    }

    /// Render the document handed to the generative model. Every region is
    /// listed in `Region::ALL` order, including empty ones.
    pub fn format(&self) -> String {
        let mut out = String::from("# 本日の経済ニュース（Google News RSS）\n\n");
        for (i, region) in Region::ALL.into_iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "## {}", region.heading());
            for (idx, item) in self.items(region).iter().enumerate() {
                let _ = writeln!(out, "\n### {}. {}", idx + 1, item.title);
                let _ = writeln!(out, "- ソース: {}", item.source);
                let _ = writeln!(out, "- 公開: {}", item.published);
                let _ = writeln!(out, "- URL: {}", item.link);
                if !item.summary.is_empty() {
                    let _ = writeln!(out, "- 概要: {}", item.summary);
                }
            }
        }
        out
    }
}

/// A feed of news items for one region.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Items in feed order. Implementations return `Ok(vec![])` for an empty
    /// feed and `Err` only when the source cannot be reached or parsed.
    async fn fetch(&self, region: Region, max_results: usize) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}
