use crate::core::spider::{domain_allowed, ParseResult, SpiderResponse};
use crate::http::HttpRequest;
use crate::stats::StatsTracker;
use crate::Scraper;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, trace, warn};
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::spawn;
use tokio::task::{JoinError, JoinHandle};

use super::{ScraperError, ScraperResult, Spider};

type CrawlTask = JoinHandle<ScraperResult<ParseResult>>;

pub struct Crawler {
    scraper: Box<dyn Scraper>,
    visited_urls: Arc<RwLock<HashSet<String>>>,
    stats: Arc<StatsTracker>,
}

impl Crawler {
    pub fn new(scraper: Box<dyn Scraper>) -> Self {
        info!("Initializing crawler");
        let stats = Arc::new(StatsTracker::new());
        let mut scraper = scraper;
        scraper.set_stats(Arc::clone(&stats));

        Self {
            scraper,
            visited_urls: Arc::new(RwLock::new(HashSet::new())),
            stats,
        }
    }

    /// Shared with the scraper; spiders that count items should use it too.
    pub fn stats(&self) -> Arc<StatsTracker> {
        Arc::clone(&self.stats)
    }

    pub fn visited_count(&self) -> usize {
        self.visited_urls.read().len()
    }

    pub async fn run<S: Spider + 'static>(&self, spider: S) -> ScraperResult<()> {
        let spider = Arc::new(spider);
        let max_concurrency = spider.config().max_concurrency.max(1);
        let mut futures: FuturesUnordered<CrawlTask> = FuturesUnordered::new();
        let mut pending: VecDeque<HttpRequest> = VecDeque::new();

        info!("Starting spider: {}", spider.name());
        debug!("Max depth: {}", spider.config().max_depth);
        spider.open().await?;

        self.enqueue(spider.start_requests(), spider.as_ref(), &mut pending);

        loop {
            while futures.len() < max_concurrency {
                let Some(request) = pending.pop_front() else {
                    break;
                };
                self.process_request(request, Arc::clone(&spider), &mut futures);
            }

            if !pending.is_empty() {
                debug!(
                    "Reached concurrent request limit {}, {} requests waiting",
                    max_concurrency,
                    pending.len()
                );
            }

            let Some(result) = futures.next().await else {
                break;
            };

            match self.handle_result(result) {
                Some(new_requests) => self.enqueue(new_requests, spider.as_ref(), &mut pending),
                None => {
                    info!("Spider requested stop");
                    for task in futures.iter() {
                        task.abort();
                    }
                    break;
                }
            }
        }

        if let Err(e) = spider.close().await {
            warn!("Spider {} failed to close cleanly: {}", spider.name(), e);
        }

        info!(
            "Spider {} completed. Total URLs processed: {}",
            spider.name(),
            self.visited_count()
        );
        self.stats.finish();
        self.stats.print_summary();
        Ok(())
    }

    /// Returns the follow-up requests of a finished task, or `None` when the
    /// spider asked the crawl to stop.
    fn handle_result(
        &self,
        result: Result<ScraperResult<ParseResult>, JoinError>,
    ) -> Option<Vec<HttpRequest>> {
        match result {
            Ok(Ok(ParseResult::Continue(new_requests))) => {
                debug!("Found {} new requests", new_requests.len());
                Some(new_requests)
            }
            Ok(Ok(ParseResult::Skip)) => {
                trace!("Nothing to follow");
                Some(Vec::new())
            }
            Ok(Ok(ParseResult::Stop)) => None,
            Ok(Err(error)) => {
                match &error {
                    ScraperError::StorageError(_) => {
                        warn!("Storage error processing request: {}", error);
                        self.stats.increment_storage_errors();
                    }
                    ScraperError::ParsingError(_) | ScraperError::MissingContext(_) => {
                        warn!("Parsing error processing request: {}", error);
                        self.stats.increment_parse_errors();
                    }
                    _ => warn!("Error processing request: {}", error),
                }
                Some(Vec::new())
            }
            Err(e) => {
                warn!("Task error: {}", e);
                Some(Vec::new())
            }
        }
    }

    fn enqueue<S: Spider>(
        &self,
        requests: Vec<HttpRequest>,
        spider: &S,
        pending: &mut VecDeque<HttpRequest>,
    ) {
        let config = spider.config();
        let allowed_domains = spider.allowed_domains();

        for request in requests {
            if request.depth >= config.max_depth {
                debug!("Skipping URL {} - max depth reached", request.url);
                continue;
            }

            if let Some(domains) = &allowed_domains {
                if !domain_allowed(&request.url, domains) {
                    debug!("Skipping URL {} - outside allowed domains", request.url);
                    continue;
                }
            }

            let url_str = request.url.to_string();
            if !config.allow_url_revisit && self.visited_urls.read().contains(&url_str) {
                debug!("Skipping URL {} - already visited", url_str);
                continue;
            }

            debug!("Queueing URL: {} at depth {}", url_str, request.depth);
            if let Some(meta) = &request.meta {
                trace!("Request metadata: {:?}", meta);
            }

            self.visited_urls.write().insert(url_str);
            pending.push_back(request);
        }
    }

    fn process_request<S: Spider + 'static>(
        &self,
        request: HttpRequest,
        spider: Arc<S>,
        futures: &mut FuturesUnordered<CrawlTask>,
    ) {
        let scraper = self.scraper.box_clone();

        futures.push(spawn(async move {
            let config = spider.config().clone();
            let response = scraper.fetch(request.clone(), &config).await?;

            if !config.accepts_status(response.status) {
                warn!(
                    "Dropping response for {} with status {}",
                    response.url, response.status
                );
                return Ok(ParseResult::Skip);
            }

            let spider_response = SpiderResponse {
                response,
                callback: request.callback,
            };
            spider.parse(spider_response).await
        }));
    }
}
