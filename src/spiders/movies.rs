//! Rule-driven crawl of a movie site, collecting download links.

use crate::core::spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::{HttpRequest, HttpResponse};
use crate::storage::{Storage, StorageBackend, StorageItem};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use log::{debug, info, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_START_URL: &str = "https://www.ygdy8.net/";
pub const COLLECTION: &str = "movies";

/// Callback for pages that are only mined for further links.
const FOLLOW_CALLBACK: &str = "follow";

static ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static DOWNLOAD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(.*?)">ftp"#).expect("static regex"));

/// Decides which extracted links are requested and what happens to them.
///
/// A rule without a callback follows its links by default; giving it a
/// callback turns following off unless [`LinkRule::follow`] says otherwise.
#[derive(Debug, Clone)]
pub struct LinkRule {
    pub allow: Regex,
    pub deny: Option<Regex>,
    pub callback: Option<SpiderCallback>,
    pub follow: bool,
}

impl LinkRule {
    pub fn allow(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            allow: Regex::new(pattern)?,
            deny: None,
            callback: None,
            follow: true,
        })
    }

    pub fn deny(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.deny = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn callback(mut self, callback: SpiderCallback) -> Self {
        self.callback = Some(callback);
        self.follow = false;
        self
    }

    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn matches(&self, url: &Url) -> bool {
        let url = url.as_str();
        self.allow.is_match(url) && !self.deny.as_ref().is_some_and(|deny| deny.is_match(url))
    }
}

/// Which rule produced a request; start pages carry none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RuleContext {
    rule: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieLink {
    pub movie_url: String,
}

pub struct MovieLinkSpider {
    start_url: Url,
    config: SpiderConfig,
    rules: Vec<LinkRule>,
    storage: Storage,
    stats: Arc<StatsTracker>,
}

impl MovieLinkSpider {
    pub fn new(storage: Storage) -> ScraperResult<Self> {
        Ok(Self {
            start_url: Url::parse(DEFAULT_START_URL)?,
            config: SpiderConfig::default(),
            rules: Self::default_rules()?,
            storage,
            stats: Arc::new(StatsTracker::new()),
        })
    }

    /// Index pages (except games) and list pages are followed; detail
    /// pages are parsed and followed.
    pub fn default_rules() -> ScraperResult<Vec<LinkRule>> {
        Ok(vec![
            LinkRule::allow(r"index.html")?.deny(r"game")?,
            LinkRule::allow(r"list_\d+_\d+.html")?.follow(true),
            LinkRule::allow(r"/\d+/\d+.html")?
                .callback(SpiderCallback::ParseItem)
                .follow(true),
        ])
    }

    pub fn with_start_url(mut self, start_url: Url) -> Self {
        self.start_url = start_url;
        self
    }

    pub fn with_config(mut self, config: SpiderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rules(mut self, rules: Vec<LinkRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_stats(mut self, stats: Arc<StatsTracker>) -> Self {
        self.stats = stats;
        self
    }

    /// Applies the rules in order; a link claimed by one rule is not seen
    /// by the later ones.
    pub fn rule_requests(&self, response: &HttpResponse) -> ScraperResult<Vec<HttpRequest>> {
        let depth = response.from_request.depth + 1;
        let links = page_links(&response.body, &response.url);
        let mut claimed = HashSet::new();
        let mut requests = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            for link in &links {
                if claimed.contains(link) || !rule.matches(link) {
                    continue;
                }
                claimed.insert(link.clone());

                let callback = rule
                    .callback
                    .clone()
                    .unwrap_or_else(|| SpiderCallback::Custom(FOLLOW_CALLBACK.to_string()));
                trace!("Rule {} claimed {}", index, link);
                requests.push(
                    HttpRequest::new(link.clone(), callback, depth)
                        .with_meta(RuleContext { rule: index })?,
                );
            }
        }
        Ok(requests)
    }

    fn follows(&self, response: &HttpResponse) -> ScraperResult<bool> {
        let context: Option<RuleContext> = response.from_request.meta_as()?;
        Ok(match context {
            Some(context) => self.rules.get(context.rule).is_some_and(|rule| rule.follow),
            None => true,
        })
    }

    async fn store_links(&self, response: &HttpResponse) -> ScraperResult<()> {
        let links = download_links(&response.body);
        info!("Found {} download links on {}", links.len(), response.url);

        for link in links {
            let item = StorageItem::new(response.url.clone(), &link)?;
            self.storage.store(item, COLLECTION).await?;
            self.stats.increment_items_stored();
        }
        Ok(())
    }
}

/// Every anchor target on the page, resolved and without fragments, in page
/// order and without repeats.
pub fn page_links(body: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(body);
    let mut seen = HashSet::new();
    doc.select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Targets of `<a href="...">ftp` anchors, read from the raw markup.
pub fn download_links(body: &str) -> Vec<MovieLink> {
    DOWNLOAD_LINK
        .captures_iter(body)
        .map(|caps| MovieLink {
            movie_url: caps[1].to_string(),
        })
        .collect()
}

#[async_trait]
impl Spider for MovieLinkSpider {
    fn name(&self) -> String {
        "movies".to_string()
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
        let response = &spider_response.response;
        if spider_response.callback == SpiderCallback::ParseItem {
            self.store_links(response).await?;
        }

        if !self.follows(response)? {
            debug!("Not following links on {}", response.url);
            return Ok(ParseResult::Skip);
        }
        Ok(ParseResult::Continue(self.rule_requests(response)?))
    }
}
