pub mod core;
pub mod http;
pub mod scrapers;
pub mod settings;
pub mod spiders;
pub mod stats;
pub mod storage;

pub use core::Crawler;
pub use core::{ParseResult, ScraperError, ScraperResult, Spider, SpiderCallback, SpiderConfig};
pub use http::{HttpRequest, HttpResponse};
pub use scrapers::Scraper;
pub use settings::Settings;
pub use stats::StatsTracker;
pub use storage::{DiskStorage, EntryStore};
