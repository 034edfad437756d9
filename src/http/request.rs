use crate::core::SpiderCallback;
use crate::ScraperResult;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub callback: SpiderCallback,
    pub meta: Option<Value>,
    pub depth: usize,
}

impl HttpRequest {
    pub fn new(url: Url, callback: SpiderCallback, depth: usize) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: Vec::new(),
            callback,
            meta: None,
            depth,
        }
    }

    pub fn with_meta<T: serde::Serialize>(mut self, meta: T) -> ScraperResult<Self> {
        self.meta = Some(serde_json::to_value(meta)?);
        Ok(self)
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Deserializes the request context, if any was attached.
    pub fn meta_as<T: DeserializeOwned>(&self) -> ScraperResult<Option<T>> {
        self.meta
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }
}
