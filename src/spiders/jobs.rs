//! Job postings from a careers listing page.

use crate::core::spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::HttpResponse;
use crate::storage::{Storage, StorageBackend, StorageItem};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use log::{debug, error, info};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_START_URL: &str = "https://careers.tencent.com/search.html";
pub const COLLECTION: &str = "jobs";

static POSTINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[class="li_txt"]"#).expect("static selector"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub name: String,
    pub title: String,
    pub info: String,
}

pub struct JobSpider {
    start_url: Url,
    config: SpiderConfig,
    storage: Storage,
    stats: Arc<StatsTracker>,
}

impl JobSpider {
    pub fn new(storage: Storage) -> ScraperResult<Self> {
        Ok(Self {
            start_url: Url::parse(DEFAULT_START_URL)?,
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

    async fn store_postings(&self, response: &HttpResponse) -> ScraperResult<()> {
        let postings = parse_postings(&response.body);
        info!("Found {} postings on {}", postings.len(), response.url);

        for posting in postings {
            let item = StorageItem::new(response.url.clone(), &posting)?
                .with_metadata(json!({ "spider": self.name(), "status": response.status }));
            self.storage.store(item, COLLECTION).await?;
            debug!("Stored posting {}", posting.name);
            self.stats.increment_items_stored();
        }
        Ok(())
    }
}

/// One posting per `li_txt` block; each field is the first text of the
/// block's own `h3`, `h4` and `p`, empty when the element is missing.
pub fn parse_postings(body: &str) -> Vec<JobPosting> {
    let doc = Html::parse_document(body);
    doc.select(&POSTINGS)
        .map(|node| JobPosting {
            name: first_child_text(node, "h3"),
            title: first_child_text(node, "h4"),
            info: first_child_text(node, "p"),
        })
        .collect()
}

fn first_child_text(element: ElementRef<'_>, tag: &str) -> String {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == tag)
        .flat_map(|child| child.children())
        .find_map(|node| node.value().as_text().map(|text| text.to_string()))
        .unwrap_or_default()
}

#[async_trait]
impl Spider for JobSpider {
    fn name(&self) -> String {
        "jobs".to_string()
    }

    fn start_urls(&self) -> Vec<Url> {
        vec![self.start_url.clone()]
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    async fn parse(&self, spider_response: SpiderResponse) -> ScraperResult<ParseResult> {
        match spider_response.callback {
            SpiderCallback::Bootstrap | SpiderCallback::ParseItem => {
                self.store_postings(&spider_response.response).await?;
                Ok(ParseResult::Skip)
            }
            ref other => {
                error!("Unhandled callback: {:?}", other);
                Ok(ParseResult::Skip)
            }
        }
    }
}
