use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, ClientBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::Scraper;
use crate::core::SpiderConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::{ScraperError, ScraperResult, StatsTracker};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum HttpScraperError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] header::InvalidHeaderName),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
}

impl From<HttpScraperError> for ScraperError {
    fn from(err: HttpScraperError) -> Self {
        match err {
            HttpScraperError::HttpError(e) => ScraperError::HttpError(e),
            other => ScraperError::ParsingError(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
    stats: Arc<StatsTracker>,
}

impl HttpScraper {
    pub fn new() -> Result<Self, HttpScraperError> {
        let client = ClientBuilder::new()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            stats: Arc::new(StatsTracker::new()),
        })
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Result<Self, HttpScraperError> {
        let mut header_map = header::HeaderMap::new();
        header_map.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(DEFAULT_USER_AGENT),
        );

        for (key, value) in headers {
            let name = header::HeaderName::from_bytes(key.as_bytes())?;
            let value = header::HeaderValue::from_str(value)?;
            header_map.insert(name, value);
        }

        self.client = ClientBuilder::new()
            .default_headers(header_map)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(self)
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_single(
        &self,
        request: HttpRequest,
        config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone());

        // Spider-wide headers first so request headers can override them
        for (key, value) in &config.headers {
            req = req.header(key, value);
        }
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        let timestamp = Utc::now();
        let response = req.send().await.map_err(HttpScraperError::from)?;
        let status = response.status().as_u16();
        let headers = Self::extract_headers(&response);
        let url = response.url().clone();
        let body = response.text().await.map_err(HttpScraperError::from)?;

        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
            timestamp,
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
