use crate::core::spider::{ParseResult, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::HttpRequest;
use crate::scrapers::{MockResponse, MockScraper};
use crate::{Crawler, ScraperError, ScraperResult, Spider};
use async_trait::async_trait;
use parking_lot::RwLock;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

/// Follows every link it sees and records what it parsed.
struct LinkSpider {
    start: Url,
    config: SpiderConfig,
    domains: Option<Vec<String>>,
    stop_on: Option<String>,
    fail_on: Option<String>,
    parsed: Arc<RwLock<Vec<String>>>,
}

impl LinkSpider {
    fn new(start: &str) -> Self {
        Self {
            start: Url::parse(start).unwrap(),
            config: SpiderConfig::default(),
            domains: None,
            stop_on: None,
            fail_on: None,
            parsed: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn with_config(mut self, config: SpiderConfig) -> Self {
        self.config = config;
        self
    }

    fn parsed(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.parsed)
    }
}

#[async_trait]
impl Spider for LinkSpider {
    fn name(&self) -> String {
        "link_spider".to_string()
    }

    fn start_urls(&self) -> Vec<Url> {
        vec![self.start.clone()]
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    fn allowed_domains(&self) -> Option<Vec<String>> {
        self.domains.clone()
    }

    async fn parse(&self, spider_response: SpiderResponse) -> ScraperResult<ParseResult> {
        let response = spider_response.response;
        let url = response.url.to_string();
        self.parsed.write().push(url.clone());

        if self.stop_on.as_deref() == Some(url.as_str()) {
            return Ok(ParseResult::Stop);
        }
        if self.fail_on.as_deref() == Some(url.as_str()) {
            return Err(ScraperError::ParsingError("broken page".to_string()));
        }

        let selector = Selector::parse("a[href]").unwrap();
        let requests: Vec<HttpRequest> = Html::parse_document(&response.body)
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| response.follow(href))
            .map(|url| {
                HttpRequest::new(url, SpiderCallback::ParseItem, response.from_request.depth + 1)
            })
            .collect();
        Ok(ParseResult::Continue(requests))
    }
}

fn links(targets: &[&str]) -> String {
    targets
        .iter()
        .map(|t| format!(r#"<a href="{}">link</a>"#, t))
        .collect()
}

#[tokio::test]
async fn test_depth_limit() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/a", &links(&["/b"]))
        .with_page("https://example.com/b", &links(&["/c"]))
        .with_page("https://example.com/c", &links(&["/d"]));

    let spider = LinkSpider::new("https://example.com/a")
        .with_config(SpiderConfig::default().with_depth(2));
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("https://example.com/a"), 1);
    assert_eq!(scraper.fetch_count("https://example.com/b"), 1);
    assert_eq!(scraper.fetch_count("https://example.com/c"), 0);
}

#[tokio::test]
async fn test_visited_urls_are_fetched_once() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/a", &links(&["/b", "/b", "/a"]))
        .with_page("https://example.com/b", &links(&["/a", "/c"]))
        .with_page("https://example.com/c", &links(&["/b"]));

    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler
        .run(LinkSpider::new("https://example.com/a"))
        .await
        .unwrap();

    assert_eq!(scraper.fetched_urls().len(), 3);
    assert_eq!(crawler.visited_count(), 3);
}

#[tokio::test]
async fn test_revisits_when_allowed() {
    let scraper = MockScraper::new().with_page("https://example.com/a", &links(&["/a"]));

    let spider = LinkSpider::new("https://example.com/a").with_config(
        SpiderConfig::default()
            .with_depth(3)
            .with_allow_url_revisit(true),
    );
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("https://example.com/a"), 3);
}

#[tokio::test]
async fn test_allowed_domains_filter_links() {
    let scraper = MockScraper::new().with_page(
        "https://www.example.com/",
        &links(&[
            "https://docs.example.com/guide",
            "https://example.org/",
            "https://notexample.com/",
        ]),
    );

    let mut spider = LinkSpider::new("https://www.example.com/");
    spider.domains = Some(vec!["example.com".to_string()]);
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("https://docs.example.com/guide"), 1);
    assert_eq!(scraper.fetch_count("https://example.org/"), 0);
    assert_eq!(scraper.fetch_count("https://notexample.com/"), 0);
}

#[tokio::test]
async fn test_error_statuses_are_not_parsed() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/", &links(&["/gone", "/broken"]))
        .with_route(
            "https://example.com/broken",
            MockResponse::status(503, "down"),
        );

    let spider = LinkSpider::new("https://example.com/");
    let parsed = spider.parsed();
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetched_urls().len(), 3);
    assert_eq!(*parsed.read(), vec!["https://example.com/".to_string()]);
}

#[tokio::test]
async fn test_allowed_error_codes_reach_the_spider() {
    let scraper = MockScraper::new().with_page("https://example.com/", &links(&["/gone"]));

    let spider = LinkSpider::new("https://example.com/")
        .with_config(SpiderConfig::default().with_allowed_error_codes(vec![404]));
    let parsed = spider.parsed();
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert!(parsed.read().contains(&"https://example.com/gone".to_string()));
    assert_eq!(crawler.stats().get_stats().status_codes.get(&404), Some(&1));
}

#[tokio::test]
async fn test_stop_ends_the_crawl() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/", &links(&["/b", "/c"]))
        .with_page("https://example.com/b", "")
        .with_page("https://example.com/c", "");

    let mut spider = LinkSpider::new("https://example.com/")
        .with_config(SpiderConfig::default().with_concurrency(1));
    spider.stop_on = Some("https://example.com/b".to_string());
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("https://example.com/b"), 1);
    assert_eq!(scraper.fetch_count("https://example.com/c"), 0);
}

#[tokio::test]
async fn test_parse_errors_are_counted_and_skipped() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/", &links(&["/bad", "/good"]))
        .with_page("https://example.com/bad", &links(&["/never"]))
        .with_page("https://example.com/good", "");

    let mut spider = LinkSpider::new("https://example.com/");
    spider.fail_on = Some("https://example.com/bad".to_string());
    let crawler = Crawler::new(Box::new(scraper.clone()));
    crawler.run(spider).await.unwrap();

    assert_eq!(scraper.fetch_count("https://example.com/good"), 1);
    assert_eq!(scraper.fetch_count("https://example.com/never"), 0);
    assert_eq!(crawler.stats().get_stats().parse_errors, 1);
}

#[tokio::test]
async fn test_stats_count_every_fetch() {
    let scraper = MockScraper::new()
        .with_page("https://example.com/", &links(&["/b"]))
        .with_page("https://example.com/b", "<p>body</p>");

    let crawler = Crawler::new(Box::new(scraper));
    crawler
        .run(LinkSpider::new("https://example.com/"))
        .await
        .unwrap();

    let stats = crawler.stats().get_stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.status_codes.get(&200), Some(&2));
    assert!(stats.end_time.is_some());
}
