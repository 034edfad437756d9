use async_trait::async_trait;
use url::Url;

use super::retry::RetryConfig;
use super::ScraperResult;
use crate::http::{HttpRequest, HttpResponse};

/// Names the parsing stage a response is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiderCallback {
    Bootstrap,
    ParsePinyin,
    ParseCharacterList,
    ParseCharacter,
    ParseItem,
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct SpiderResponse {
    pub response: HttpResponse,
    pub callback: SpiderCallback,
}

#[derive(Debug)]
pub enum ParseResult {
    Continue(Vec<HttpRequest>),
    Skip,
    Stop,
}

#[derive(Debug, Clone)]
pub struct SpiderConfig {
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub allow_url_revisit: bool,
    pub headers: Vec<(String, String)>,
    pub retry_config: RetryConfig,
    /// Error statuses that are still handed to the spider instead of dropped.
    pub allowed_error_codes: Vec<u16>,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_concurrency: 16,
            allow_url_revisit: false,
            headers: Vec::new(),
            retry_config: RetryConfig::default(),
            allowed_error_codes: Vec::new(),
        }
    }
}

impl SpiderConfig {
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    pub fn with_allow_url_revisit(mut self, allow: bool) -> Self {
        self.allow_url_revisit = allow;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_allowed_error_codes(mut self, codes: Vec<u16>) -> Self {
        self.allowed_error_codes = codes;
        self
    }

    pub fn accepts_status(&self, status: u16) -> bool {
        status < 400 || self.allowed_error_codes.contains(&status)
    }
}

#[async_trait]
pub trait Spider: Send + Sync {
    fn name(&self) -> String;
    fn start_urls(&self) -> Vec<Url>;
    fn config(&self) -> &SpiderConfig;

    fn start_requests(&self) -> Vec<HttpRequest> {
        self.start_urls()
            .into_iter()
            .map(|url| HttpRequest::new(url, SpiderCallback::Bootstrap, 0))
            .collect()
    }

    fn allowed_domains(&self) -> Option<Vec<String>> {
        None
    }

    /// Called once before the first request is scheduled.
    async fn open(&self) -> ScraperResult<()> {
        Ok(())
    }

    /// Called once after the last response has been parsed.
    async fn close(&self) -> ScraperResult<()> {
        Ok(())
    }

    async fn parse(&self, response: SpiderResponse) -> ScraperResult<ParseResult>;
}

pub(crate) fn domain_allowed(url: &Url, allowed: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    allowed.iter().any(|domain| {
        host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_allowed_accepts_subdomains() {
        let allowed = vec!["chazidian.com".to_string()];
        let url = Url::parse("https://www.chazidian.com/zi_a_1/").unwrap();
        assert!(domain_allowed(&url, &allowed));

        let url = Url::parse("https://chazidian.com/").unwrap();
        assert!(domain_allowed(&url, &allowed));
    }

    #[test]
    fn test_domain_allowed_rejects_lookalikes() {
        let allowed = vec!["chazidian.com".to_string()];
        let url = Url::parse("https://notchazidian.com/").unwrap();
        assert!(!domain_allowed(&url, &allowed));

        let url = Url::parse("https://www.baidu.com/").unwrap();
        assert!(!domain_allowed(&url, &allowed));
    }

    #[test]
    fn test_accepts_status() {
        let config = SpiderConfig::default().with_allowed_error_codes(vec![404]);
        assert!(config.accepts_status(200));
        assert!(config.accepts_status(302));
        assert!(config.accepts_status(404));
        assert!(!config.accepts_status(500));
    }
}
