use crate::core::retry::RetryCategory;
use crate::http::HttpRequest;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub retry_count: usize,
    pub retry_history: HashMap<RetryCategory, usize>,
    pub from_request: Box<HttpRequest>,
}

impl HttpResponse {
    /// Resolves a link found in this response, the way a browser would.
    pub fn follow(&self, href: &str) -> Option<Url> {
        self.url.join(href.trim()).ok()
    }
}
