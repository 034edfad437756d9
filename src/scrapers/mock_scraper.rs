use crate::core::SpiderConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use url::Url;

use super::Scraper;

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }
}

/// Serves canned responses keyed by URL and remembers every URL it was
/// asked for. A route with several responses plays them in order and then
/// repeats the last one. Unknown URLs answer 404 with an empty body.
#[derive(Clone, Default)]
pub struct MockScraper {
    routes: Arc<HashMap<String, Vec<MockResponse>>>,
    fetched: Arc<RwLock<Vec<Url>>>,
    stats: Arc<StatsTracker>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, url: &str, response: MockResponse) -> Self {
        self.with_responses(url, vec![response])
    }

    pub fn with_responses(mut self, url: &str, responses: Vec<MockResponse>) -> Self {
        let key = Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        Arc::make_mut(&mut self.routes).insert(key, responses);
        self
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.with_route(url, MockResponse::ok(body))
    }

    pub fn fetched_urls(&self) -> Vec<Url> {
        self.fetched.read().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched
            .read()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch_single(
        &self,
        request: HttpRequest,
        _config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let attempt = {
            let mut fetched = self.fetched.write();
            let attempt = fetched.iter().filter(|u| **u == request.url).count();
            fetched.push(request.url.clone());
            attempt
        };
        let response = self
            .routes
            .get(request.url.as_str())
            .and_then(|responses| responses.get(attempt).or_else(|| responses.last()))
            .cloned()
            .unwrap_or_else(|| MockResponse::status(404, ""));

        if let Some(delay) = response.delay {
            sleep(delay).await;
        }

        Ok(HttpResponse {
            url: request.url.clone(),
            status: response.status,
            headers: HashMap::new(),
            body: response.body,
            timestamp: Utc::now(),
            retry_count: 0,
            retry_history: HashMap::new(),
            from_request: Box::new(request),
        })
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }

    fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    fn set_stats(&mut self, stats: Arc<StatsTracker>) {
        self.stats = stats;
    }
}
