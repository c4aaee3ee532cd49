// tests/news_format.rs
//
// Offline news ingestion: fixture feeds → NewsBundle → prompt document.

use std::collections::HashMap;
use std::sync::Arc;

use daily_econ_shorts::ingest::providers::GoogleNewsRss;
use daily_econ_shorts::ingest::types::Region;
use daily_econ_shorts::ingest::NewsAggregator;

fn fixture_source() -> GoogleNewsRss {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/news");
    let fixtures: HashMap<Region, String> = Region::ALL
        .into_iter()
        .map(|r| {
            let xml = std::fs::read_to_string(format!("{dir}/{}.xml", r.key()))
                .expect("read fixture");
            (r, xml)
        })
        .collect();
    GoogleNewsRss::from_fixtures(fixtures)
}

#[tokio::test]
async fn fixture_feeds_render_expected_document() {
    let agg = NewsAggregator::new(Arc::new(fixture_source()));
    let bundle = agg.fetch(&Region::ALL, 5).await;

    assert_eq!(bundle.total_items(), 3);
    assert!(bundle.items(Region::China).is_empty());

    let doc = NewsAggregator::format(&bundle);
    let expected = "\
# 本日の経済ニュース（Google News RSS）

## 🇯🇵 日本経済ニュース

### 1. 日銀、政策金利を据え置き - 日本経済新聞
- ソース: 日本経済新聞
- 公開: Mon, 01 Sep 2025 09:00:00 GMT
- URL: https://news.google.com/articles/jp-1
- 概要: 日銀は金融政策決定会合で 政策金利の据え置きを決めた

### 2. 円相場、一時1ドル=147円台
- ソース: Google News
- 公開: Mon, 01 Sep 2025 08:00:00 GMT
- URL: https://news.google.com/articles/jp-2

## 🇺🇸 米国経済ニュース

### 1. 米雇用統計、予想上回る
- ソース: ロイター
- 公開: Fri, 05 Sep 2025 13:30:00 GMT
- URL: https://news.google.com/articles/us-1
- 概要: 非農業部門雇用者数は 前月比で増加

## 🇨🇳 中国経済ニュース
";
    assert_eq!(doc, expected);
}

#[tokio::test]
async fn max_per_region_caps_each_feed() {
    let agg = NewsAggregator::new(Arc::new(fixture_source()));
    let bundle = agg.fetch(&[Region::Japan, Region::Us], 1).await;
    assert_eq!(bundle.items(Region::Japan).len(), 1);
    assert_eq!(bundle.items(Region::Us).len(), 1);
    assert_eq!(bundle.items(Region::Japan)[0].region, Region::Japan);
}
