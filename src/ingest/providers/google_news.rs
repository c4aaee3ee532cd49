// src/ingest/providers/google_news.rs
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{NewsItem, NewsSource, Region};

const DEFAULT_SOURCE_NAME: &str = "Google News";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

/// `<source url="https://www.nikkei.com">日本経済新聞</source>`
#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Google News RSS, either over HTTP or from in-memory fixtures.
pub struct GoogleNewsRss {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<Region, String>),
    Http {
        client: reqwest::Client,
        feeds: HashMap<Region, String>,
    },
}

impl GoogleNewsRss {
    /// Live feeds at each region's default URL.
    pub fn from_default_urls() -> Result<Self> {
        let feeds = Region::ALL
            .into_iter()
            .map(|r| (r, r.feed_url().to_string()))
            .collect();
        Self::from_urls(feeds)
    }

    pub fn from_urls(feeds: HashMap<Region, String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("daily-econ-shorts/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http { client, feeds },
        })
    }

    /// Serve the given XML per region; regions without a fixture yield an
    /// empty feed.
    pub fn from_fixtures<I, S>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = (Region, S)>,
        S: Into<String>,
    {
        Self {
            mode: Mode::Fixture(fixtures.into_iter().map(|(r, s)| (r, s.into())).collect()),
        }
    }

    /// Parse one RSS document into at most `max_results` items.
    pub fn parse_feed(xml: &str, region: Region, max_results: usize) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", region.key()))?;

        let out: Vec<NewsItem> = rss
            .channel
            .item
            .into_iter()
            .take(max_results)
            .map(|it| NewsItem {
                title: it.title.unwrap_or_default().trim().to_string(),
                link: it.link.unwrap_or_default().trim().to_string(),
                published: it.pub_date.unwrap_or_default().trim().to_string(),
                summary: it
                    .description
                    .as_deref()
                    .map(normalize_text)
                    .unwrap_or_default(),
                source: it
                    .source
                    .and_then(|s| s.name)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string()),
                region,
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl NewsSource for GoogleNewsRss {
    async fn fetch(&self, region: Region, max_results: usize) -> Result<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(map) => match map.get(&region) {
                Some(xml) => Self::parse_feed(xml, region, max_results),
                None => Ok(Vec::new()),
            },
            Mode::Http { client, feeds } => {
                let Some(url) = feeds.get(&region) else {
                    tracing::debug!(region = region.key(), "no feed configured for region");
                    return Ok(Vec::new());
                };
                tracing::info!(target: "ingest", region = region.key(), "fetching Google News RSS");
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} rss get()", region.key()))?
                    .error_for_status()
                    .with_context(|| format!("{} rss non-2xx", region.key()))?
                    .text()
                    .await
                    .with_context(|| format!("{} rss .text()", region.key()))?;
                Self::parse_feed(&body, region, max_results)
            }
        }
    }

    fn name(&self) -> &'static str {
        "google-news"
    }
}

/// quick-xml only knows the XML entities; feeds routinely leak HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
