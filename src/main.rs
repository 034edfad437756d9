use anyhow::Context;
use log::info;
use std::sync::Arc;

use wordscraper::scrapers::HttpScraper;
use wordscraper::settings::SpiderKind;
use wordscraper::spiders::{DictionarySpider, JobSpider, MovieLinkSpider, SoundTrackSpider};
use wordscraper::storage::{create_storage, MemoryEntryStore, SqlEntryStore, StorageType};
use wordscraper::{Crawler, EntryStore, Settings, Spider, SpiderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("selectors", log::LevelFilter::Warn)
        .filter_module("html5ever", log::LevelFilter::Error)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .init();

    let settings = Settings::from_env().context("reading settings")?;
    info!("Running {} spider", settings.spider);

    let scraper = HttpScraper::new().context("building HTTP client")?;
    let crawler = Crawler::new(Box::new(scraper));

    match settings.spider {
        SpiderKind::Dictionary => {
            let store: Arc<dyn EntryStore> = match &settings.database_url {
                Some(url) => Arc::new(
                    SqlEntryStore::connect(url)
                        .await
                        .context("connecting entry store")?,
                ),
                None => {
                    info!("DATABASE_URL not set, keeping entries in memory");
                    Arc::new(MemoryEntryStore::new())
                }
            };
            let mut spider = DictionarySpider::new(store)?.with_stats(crawler.stats());
            if let Some(url) = settings.start_url.clone() {
                spider = spider.with_start_url(url);
            }
            let config = tuned(DictionarySpider::default_config(), &settings);
            crawler.run(spider.with_config(config)).await?;
        }
        SpiderKind::Jobs => {
            let storage = create_storage(StorageType::Disk {
                path: settings.output.clone(),
            })
            .await?;
            let mut spider = JobSpider::new(storage)?.with_stats(crawler.stats());
            if let Some(url) = settings.start_url.clone() {
                spider = spider.with_start_url(url);
            }
            let config = tuned(spider.config().clone(), &settings);
            crawler.run(spider.with_config(config)).await?;
        }
        SpiderKind::Movies => {
            let storage = create_storage(StorageType::Disk {
                path: settings.output.clone(),
            })
            .await?;
            let mut spider = MovieLinkSpider::new(storage)?.with_stats(crawler.stats());
            if let Some(url) = settings.start_url.clone() {
                spider = spider.with_start_url(url);
            }
            let config = tuned(spider.config().clone(), &settings);
            crawler.run(spider.with_config(config)).await?;
        }
        SpiderKind::Sounds => {
            let storage = create_storage(StorageType::Disk {
                path: settings.output.clone(),
            })
            .await?;
            let mut spider = SoundTrackSpider::new(storage)?.with_stats(crawler.stats());
            if let Some(url) = settings.start_url.clone() {
                spider = spider.with_start_url(url);
            }
            let config = tuned(spider.config().clone(), &settings);
            crawler.run(spider.with_config(config)).await?;
        }
    }

    Ok(())
}

fn tuned(config: SpiderConfig, settings: &Settings) -> SpiderConfig {
    match settings.concurrency {
        Some(concurrency) => config.with_concurrency(concurrency),
        None => config,
    }
}
