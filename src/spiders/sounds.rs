//! Track links from the paged sound list of an audiobook album.

use crate::core::spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::{HttpRequest, HttpResponse};
use crate::storage::{Storage, StorageBackend, StorageItem};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use log::{debug, error, info};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_START_URL: &str = "https://www.ximalaya.com/youshengshu/12576446/p1";
pub const COLLECTION: &str = "sounds";

static TRACK_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "#anchor_sound_list > div:nth-of-type(2) > ul > li > div:nth-of-type(2) > a[href]",
    )
    .expect("static selector")
});
static NEXT_PAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "#anchor_sound_list > div:nth-of-type(2) > div > nav > ul > li:last-of-type > a[href]",
    )
    .expect("static selector")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundLink {
    pub address: String,
}

pub struct SoundTrackSpider {
    start_url: Url,
    config: SpiderConfig,
    storage: Storage,
    stats: Arc<StatsTracker>,
}

impl SoundTrackSpider {
    pub fn new(storage: Storage) -> ScraperResult<Self> {
        Ok(Self {
            start_url: Url::parse(DEFAULT_START_URL)?,
            // List pages chain at depth 0, tracks are not fetched
            config: SpiderConfig::default().with_depth(1),
            storage,
            stats: Arc::new(StatsTracker::new()),
        })
    }

    pub fn with_start_url(mut self, start_url: Url) -> Self {
        self.start_url = start_url;
        self
    }

    pub fn with_config(mut self, config: SpiderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_stats(mut self, stats: Arc<StatsTracker>) -> Self {
        self.stats = stats;
        self
    }

    async fn store_tracks(&self, response: &HttpResponse) -> ScraperResult<()> {
        let tracks = track_links(&response.body, &response.url);
        info!("Found {} tracks on {}", tracks.len(), response.url);

        for track in tracks {
            let item = StorageItem::new(response.url.clone(), &track)?
                .with_metadata(json!({ "spider": self.name() }));
            self.storage.store(item, COLLECTION).await?;
            debug!("Stored track {}", track.address);
            self.stats.increment_items_stored();
        }
        Ok(())
    }

    /// The following list page, kept at the current depth so a long album
    /// is not cut off by the depth limit.
    fn next_page(&self, response: &HttpResponse) -> Option<HttpRequest> {
        next_page_url(&response.body, &response.url).map(|url| {
            HttpRequest::new(
                url,
                SpiderCallback::ParseItem,
                response.from_request.depth,
            )
        })
    }
}

/// Track anchors of the sound list, resolved against the page URL.
pub fn track_links(body: &str, base: &Url) -> Vec<SoundLink> {
    let doc = Html::parse_document(body);
    doc.select(&TRACK_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| SoundLink {
            address: url.to_string(),
        })
        .collect()
}

/// Target of the last pager entry, if it is a link.
pub fn next_page_url(body: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(body);
    doc.select(&NEXT_PAGE)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| base.join(href.trim()).ok())
}

#[async_trait]
impl Spider for SoundTrackSpider {
    fn name(&self) -> String {
        "sounds".to_string()
    }

    fn start_urls(&self) -> Vec<Url> {
        vec![self.start_url.clone()]
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    fn allowed_domains(&self) -> Option<Vec<String>> {
        self.start_url
            .host_str()
            .map(|host| vec![host.trim_start_matches("www.").to_string()])
    }

    async fn parse(&self, spider_response: SpiderResponse) -> ScraperResult<ParseResult> {
        match spider_response.callback {
            SpiderCallback::Bootstrap | SpiderCallback::ParseItem => {
                let response = &spider_response.response;
                self.store_tracks(response).await?;
                match self.next_page(response) {
                    Some(request) => Ok(ParseResult::Continue(vec![request])),
                    None => {
                        debug!("No further list page after {}", response.url);
                        Ok(ParseResult::Skip)
                    }
                }
            }
            ref other => {
                error!("Unhandled callback: {:?}", other);
                Ok(ParseResult::Skip)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::MockScraper;
    use crate::storage::{create_storage, StorageType};
    use crate::Crawler;
    use std::fs;

    const PAGE_2: &str = "https://www.ximalaya.com/youshengshu/12576446/p2/";

    fn list_page(tracks: &[&str], pager: &str) -> String {
        let items: String = tracks
            .iter()
            .map(|href| {
                format!(
                    r#"<li><div class="num">1</div><div class="text"><a href="{}" title="t">t</a></div></li>"#,
                    href
                )
            })
            .collect();
        format!(
            r#"<html><body><div id="anchor_sound_list">
                <div class="head">声音</div>
                <div>
                    <ul>{}</ul>
                    <div><nav><ul>{}</ul></nav></div>
                </div>
            </div></body></html>"#,
            items, pager
        )
    }

    async fn disk_storage(dir: &tempfile::TempDir) -> Storage {
        create_storage(StorageType::Disk {
            path: dir.path().to_string_lossy().to_string(),
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_track_links_resolve_against_site() {
        let base = Url::parse(DEFAULT_START_URL).unwrap();
        let body = list_page(
            &["/youshengshu/12576446/1001", "/youshengshu/12576446/1002"],
            "",
        );

        assert_eq!(
            track_links(&body, &base),
            vec![
                SoundLink {
                    address: "https://www.ximalaya.com/youshengshu/12576446/1001".to_string()
                },
                SoundLink {
                    address: "https://www.ximalaya.com/youshengshu/12576446/1002".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_only_the_second_column_anchor_is_a_track() {
        let base = Url::parse(DEFAULT_START_URL).unwrap();
        let body = r#"<div id="anchor_sound_list"><div></div><div><ul>
            <li><div><a href="/album">album</a></div><div><a href="/track">track</a></div></li>
        </ul></div></div>"#;

        let tracks = track_links(body, &base);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].address, "https://www.ximalaya.com/track");
    }

    #[test]
    fn test_next_page_is_the_last_pager_entry() {
        let base = Url::parse(DEFAULT_START_URL).unwrap();
        let body = list_page(
            &[],
            r#"<li><a href="/youshengshu/12576446/p1/">1</a></li>
               <li><a href="/youshengshu/12576446/p2/">下一页</a></li>"#,
        );
        assert_eq!(next_page_url(&body, &base).unwrap().as_str(), PAGE_2);

        // A disabled next entry has no anchor
        let last = list_page(
            &[],
            r#"<li><a href="/youshengshu/12576446/p1/">1</a></li><li><span>下一页</span></li>"#,
        );
        assert!(next_page_url(&last, &base).is_none());
    }

    #[tokio::test]
    async fn test_crawl_follows_pages_and_stores_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let scraper = MockScraper::new()
            .with_page(
                DEFAULT_START_URL,
                &list_page(
                    &["/youshengshu/12576446/1001", "/youshengshu/12576446/1002"],
                    r#"<li><a href="/youshengshu/12576446/p2/">下一页</a></li>"#,
                ),
            )
            .with_page(
                PAGE_2,
                &list_page(
                    &["/youshengshu/12576446/1003"],
                    r#"<li><a href="https://other.example/p3/">elsewhere</a></li>"#,
                ),
            );

        let crawler = Crawler::new(Box::new(scraper.clone()));
        let spider = SoundTrackSpider::new(disk_storage(&dir).await)
            .unwrap()
            .with_stats(crawler.stats());
        crawler.run(spider).await.unwrap();

        assert_eq!(scraper.fetch_count(DEFAULT_START_URL), 1);
        assert_eq!(scraper.fetch_count(PAGE_2), 1);
        // Off-site pages are filtered by the allowed domain
        assert_eq!(scraper.fetched_urls().len(), 2);
        assert_eq!(crawler.stats().get_stats().items_stored, 3);

        let content = fs::read_to_string(dir.path().join("sounds.jsonl")).unwrap();
        let addresses: Vec<String> = content
            .lines()
            .map(|line| {
                let record: serde_json::Value = serde_json::from_str(line).unwrap();
                record["data"]["address"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            addresses,
            vec![
                "https://www.ximalaya.com/youshengshu/12576446/1001",
                "https://www.ximalaya.com/youshengshu/12576446/1002",
                "https://www.ximalaya.com/youshengshu/12576446/1003",
            ]
        );
    }

    #[tokio::test]
    async fn test_pager_pointing_back_stops_the_crawl() {
        let dir = tempfile::tempdir().unwrap();
        let scraper = MockScraper::new().with_page(
            DEFAULT_START_URL,
            &list_page(
                &["/youshengshu/12576446/1001"],
                r#"<li><a href="/youshengshu/12576446/p1">1</a></li>"#,
            ),
        );

        let crawler = Crawler::new(Box::new(scraper.clone()));
        let spider = SoundTrackSpider::new(disk_storage(&dir).await)
            .unwrap()
            .with_stats(crawler.stats());
        crawler.run(spider).await.unwrap();

        assert_eq!(scraper.fetch_count(DEFAULT_START_URL), 1);
        assert_eq!(crawler.stats().get_stats().items_stored, 1);
    }
}
