//! Four-stage crawl of an online character dictionary.
//!
//! letter index → pinyin index → character list → character detail. The
//! character list is where already-stored characters are filtered out, so a
//! rerun only fetches detail pages for characters it has not seen.

mod detail;
mod entry;
mod text;

pub use detail::{
    extract_basic_definition, extract_detailed, general_block_index, parse_character_detail,
    BasicDefinitionStrategy, CharacterDetail, DetailedDefinitions, HeadingLayout,
    NavigationLayout, BASIC_DEFINITION_STRATEGIES, GENERAL_BLOCK_ANCHOR,
};
pub use entry::{CharacterContext, DictionaryEntry};
pub use text::{normalize, render_listing};

use crate::core::retry::RetryConfig;
use crate::core::spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::{HttpRequest, HttpResponse};
use crate::storage::EntryStore;
use crate::{ScraperError, ScraperResult, StatsTracker};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

pub const DEFAULT_START_URL: &str = "https://www.chazidian.com/";

static PINYIN_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "#danzi > div:nth-of-type(1) > div > div:nth-of-type(2) > div:nth-of-type(2) > ul > li > a",
    )
    .expect("static selector")
});
static GROUP_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class="pyjs_c"] > div > a"#).expect("static selector")
});
static CHARACTER_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class="box_content"] > div > a"#).expect("static selector")
});

/// Character group pages live at the site root as `zi_<word>_<digits>/`.
static CHARACTER_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^/\s]+/zi_\w+_\d+/").expect("static regex"));

/// A character-list link paired with the character it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterLink {
    pub url: Url,
    pub name: String,
}

pub struct DictionarySpider {
    start_url: Url,
    config: SpiderConfig,
    store: Arc<dyn EntryStore>,
    stats: Arc<StatsTracker>,
}

impl DictionarySpider {
    pub fn new(store: Arc<dyn EntryStore>) -> ScraperResult<Self> {
        Ok(Self {
            start_url: Url::parse(DEFAULT_START_URL)?,
            config: Self::default_config(),
            store,
            stats: Arc::new(StatsTracker::new()),
        })
    }

    /// Concurrency and headers the site tolerates. Error pages are dropped by
    /// the crawler, so a missing detail page leaves no entry behind.
    pub fn default_config() -> SpiderConfig {
        SpiderConfig::default()
            .with_depth(4)
            .with_concurrency(32)
            .with_retry(RetryConfig::polite())
            .with_headers(vec![
                ("Referer", "https://www.chazidian.com/zi_a/"),
                ("Upgrade-Insecure-Requests", "1"),
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

    pub fn with_stats(mut self, stats: Arc<StatsTracker>) -> Self {
        self.stats = stats;
        self
    }

    /// Stage 1: every pinyin index linked from the letter index.
    pub fn pinyin_index_requests(&self, response: &HttpResponse) -> Vec<HttpRequest> {
        let depth = response.from_request.depth + 1;
        extract_hrefs(&response.body, &PINYIN_LINKS)
            .into_iter()
            .filter_map(|href| response.follow(&href))
            .map(|url| HttpRequest::new(url, SpiderCallback::ParsePinyin, depth))
            .collect()
    }

    /// Stage 2: character-group links, keeping only `zi_<word>_<digits>/` pages.
    pub fn character_group_requests(&self, response: &HttpResponse) -> Vec<HttpRequest> {
        let depth = response.from_request.depth + 1;
        extract_hrefs(&response.body, &GROUP_LINKS)
            .into_iter()
            .filter_map(|href| {
                let url = response.follow(&href)?;
                match character_group_url(&url) {
                    Some(group) => Some(group),
                    None => {
                        debug!("Dropping non-group link {}", url);
                        None
                    }
                }
            })
            .map(|url| HttpRequest::new(url, SpiderCallback::ParseCharacterList, depth))
            .collect()
    }

    /// Stage 3: a detail request for every listed character not yet stored.
    pub async fn character_requests(
        &self,
        response: &HttpResponse,
    ) -> ScraperResult<Vec<HttpRequest>> {
        let depth = response.from_request.depth + 1;
        let links = character_links(&response.body, &response.url);
        let mut requests = Vec::with_capacity(links.len());

        for link in links {
            match self.store.entry_exists(&link.name).await {
                Ok(false) => {
                    let request = HttpRequest::new(link.url, SpiderCallback::ParseCharacter, depth)
                        .with_meta(CharacterContext { name: link.name })?;
                    requests.push(request);
                }
                Ok(true) => {
                    debug!("Skipping {} - already stored", link.name);
                    self.stats.increment_duplicates_skipped();
                }
                Err(e) => {
                    warn!("Existence check failed for {}: {}", link.name, e);
                    self.stats.increment_storage_errors();
                }
            }
        }
        Ok(requests)
    }

    /// Stage 4: the entry described by a character's detail page.
    pub fn parse_character(&self, response: &HttpResponse) -> ScraperResult<DictionaryEntry> {
        let context: CharacterContext = response
            .from_request
            .meta_as()?
            .ok_or(ScraperError::MissingContext("character name"))?;

        info!("Parsing character {}", context.name);
        let detail = parse_character_detail(&response.body);
        debug!(
            "{}: pinyin={:?} strokes={:?} radical={:?} general_block={}",
            context.name,
            detail.pinyin,
            detail.strokes,
            detail.radical,
            detail.general_block_index()
        );
        Ok(DictionaryEntry::from_detail(context.name, detail))
    }

    async fn store_entry(&self, entry: DictionaryEntry) {
        match self.store.insert(&entry).await {
            Ok(()) => {
                info!("Stored character {}", entry.name);
                self.stats.increment_items_stored();
            }
            Err(e) => {
                warn!("Failed to store character {}: {}", entry.name, e);
                self.stats.increment_storage_errors();
            }
        }
    }
}

/// The group-page URL inside `url`, if it has one.
pub fn character_group_url(url: &Url) -> Option<Url> {
    CHARACTER_GROUP
        .find(url.as_str())
        .and_then(|m| Url::parse(m.as_str()).ok())
}

/// Link/name pairs from a character list, in page order. Both values come
/// from the same anchor; anchors missing either are left out.
pub fn character_links(body: &str, base: &Url) -> Vec<CharacterLink> {
    let doc = Html::parse_document(body);
    doc.select(&CHARACTER_LINKS)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let name = anchor.value().attr("title")?;
            let url = base.join(href.trim()).ok()?;
            Some(CharacterLink {
                url,
                name: name.to_string(),
            })
        })
        .collect()
}

fn extract_hrefs(body: &str, selector: &Selector) -> Vec<String> {
    let doc = Html::parse_document(body);
    doc.select(selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Spider for DictionarySpider {
    fn name(&self) -> String {
        "dictionary".to_string()
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

    async fn open(&self) -> ScraperResult<()> {
        if let Err(e) = self.store.ensure_schema().await {
            warn!("Could not prepare entry store: {}", e);
            self.stats.increment_storage_errors();
        }
        Ok(())
    }

    async fn parse(&self, spider_response: SpiderResponse) -> ScraperResult<ParseResult> {
        let response = &spider_response.response;
        match spider_response.callback {
            SpiderCallback::Bootstrap => {
                Ok(ParseResult::Continue(self.pinyin_index_requests(response)))
            }
            SpiderCallback::ParsePinyin => {
                Ok(ParseResult::Continue(self.character_group_requests(response)))
            }
            SpiderCallback::ParseCharacterList => Ok(ParseResult::Continue(
                self.character_requests(response).await?,
            )),
            SpiderCallback::ParseCharacter => {
                let entry = self.parse_character(response)?;
                self.store_entry(entry).await;
                Ok(ParseResult::Skip)
            }
            ref other => {
                error!("Unhandled callback: {:?}", other);
                Ok(ParseResult::Skip)
            }
        }
    }
}
