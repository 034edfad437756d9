use crate::core::retry::{
    BackoffPolicy, CategoryConfig, ContentRetryCondition, RetryCategory, RetryCondition,
    RetryConfig,
};
use crate::core::spider::SpiderConfig;
use crate::core::SpiderCallback;
use crate::http::HttpRequest;
use crate::scrapers::{MockResponse, MockScraper};
use crate::Scraper;
use std::time::Duration;
use url::Url;

const URL: &str = "https://www.chazidian.com/zi_a/";

fn rate_limit_category(max_retries: usize, backoff_policy: BackoffPolicy) -> CategoryConfig {
    CategoryConfig {
        max_retries,
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_secs(1),
        conditions: vec![RetryCondition::StatusCode(429)],
        backoff_policy,
    }
}

fn config_with(category: RetryCategory, config: CategoryConfig) -> SpiderConfig {
    let mut retry_config = RetryConfig::default();
    retry_config.categories.insert(category, config);
    SpiderConfig::default().with_retry(retry_config)
}

fn request() -> HttpRequest {
    HttpRequest::new(Url::parse(URL).unwrap(), SpiderCallback::Bootstrap, 0)
}

#[tokio::test]
async fn test_rate_limit_retry() {
    let scraper = MockScraper::new().with_responses(
        URL,
        vec![
            MockResponse::status(429, "Rate limited"),
            MockResponse::ok("Success"),
        ],
    );
    let config = config_with(
        RetryCategory::RateLimit,
        rate_limit_category(3, BackoffPolicy::Constant),
    );

    let response = scraper.fetch(request(), &config).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "Success");
    assert_eq!(response.retry_count, 1);
    assert_eq!(
        response.retry_history.get(&RetryCategory::RateLimit),
        Some(&1)
    );
    assert_eq!(scraper.stats().get_stats().retry_count, 1);
}

#[tokio::test]
async fn test_bot_detection_retry() {
    let scraper = MockScraper::new().with_responses(
        URL,
        vec![
            MockResponse::ok("Bot detected, please try again"),
            MockResponse::ok("Welcome user"),
        ],
    );
    let config = config_with(
        RetryCategory::BotDetection,
        CategoryConfig {
            initial_delay: Duration::from_millis(10),
            conditions: vec![RetryCondition::Content(ContentRetryCondition::text(
                "bot detected",
            ))],
            backoff_policy: BackoffPolicy::Constant,
            ..CategoryConfig::default()
        },
    );

    let response = scraper.fetch(request(), &config).await.unwrap();

    assert_eq!(response.body, "Welcome user");
    assert_eq!(
        response.retry_history.get(&RetryCategory::BotDetection),
        Some(&1)
    );
}

#[tokio::test]
async fn test_exponential_backoff() {
    let scraper = MockScraper::new().with_responses(
        URL,
        vec![
            MockResponse::status(429, "Rate limited"),
            MockResponse::status(429, "Rate limited"),
            MockResponse::ok("Success"),
        ],
    );
    let config = config_with(
        RetryCategory::RateLimit,
        rate_limit_category(3, BackoffPolicy::Exponential { factor: 2.0 }),
    );

    let start = std::time::Instant::now();
    let response = scraper.fetch(request(), &config).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status, 200);
    assert_eq!(response.retry_count, 2);
    // 50ms then 100ms
    assert!(elapsed >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let scraper = MockScraper::new().with_route(URL, MockResponse::status(429, "Rate limited"));
    let config = config_with(
        RetryCategory::RateLimit,
        rate_limit_category(2, BackoffPolicy::Constant),
    );

    let response = scraper.fetch(request(), &config).await.unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_count, 2);
    assert_eq!(scraper.fetch_count(URL), 3);
}

#[tokio::test]
async fn test_no_retry_without_matching_category() {
    let scraper = MockScraper::new().with_route(URL, MockResponse::status(503, "down"));
    let config = config_with(
        RetryCategory::RateLimit,
        rate_limit_category(3, BackoffPolicy::Constant),
    );

    let response = scraper.fetch(request(), &config).await.unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.retry_count, 0);
    assert_eq!(scraper.fetch_count(URL), 1);
}

#[test]
fn test_delay_is_capped() {
    let config = CategoryConfig {
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(5),
        backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
        ..CategoryConfig::default()
    };
    assert_eq!(config.calculate_delay(0), Duration::from_secs(1));
    assert_eq!(config.calculate_delay(2), Duration::from_secs(4));
    assert_eq!(config.calculate_delay(5), Duration::from_secs(5));

    let linear = CategoryConfig {
        backoff_policy: BackoffPolicy::Linear,
        ..config
    };
    assert_eq!(linear.calculate_delay(3), Duration::from_secs(3));
}

#[test]
fn test_conditions() {
    assert!(RetryCondition::StatusRange(500, 599).matches(502, ""));
    assert!(!RetryCondition::StatusRange(500, 599).matches(404, ""));

    let regex = ContentRetryCondition::regex("rate limit|too many requests").unwrap();
    assert!(regex.matches("error: too many requests"));
    assert!(!regex.matches("Too Many Requests"));

    let plain = ContentRetryCondition::text("Captcha");
    assert!(plain.matches("please solve the CAPTCHA"));

    assert!(ContentRetryCondition::regex("(").is_err());
}

#[test]
fn test_polite_config_matches_rate_limit_messages() {
    let config = RetryConfig::polite();
    let url = Url::parse(URL).unwrap();

    let (category, _) = config
        .should_retry(&url, 200, "slow down: rate limit exceeded")
        .unwrap();
    assert_eq!(category, RetryCategory::RateLimit);
    assert!(config.should_retry(&url, 200, "欢迎").is_none());
}

#[test]
fn test_polite_config_retries_server_errors_per_url() {
    let config = RetryConfig::polite();
    let url = Url::parse(URL).unwrap();
    let other = Url::parse("https://www.chazidian.com/zi_b/").unwrap();

    for _ in 0..3 {
        let (category, _) = config.should_retry(&url, 500, "").unwrap();
        assert_eq!(category, RetryCategory::ServerError);
    }
    assert!(config.should_retry(&url, 500, "").is_none());
    assert!(config.should_retry(&other, 500, "").is_some());
    assert!(config.should_retry(&url, 200, "ok").is_none());
    assert_eq!(config.get_retry_state(&url).total_retries, 3);
}

#[test]
fn test_clones_share_retry_counters() {
    let config = RetryConfig::polite();
    let clone = config.clone();
    let url = Url::parse(URL).unwrap();

    config.should_retry(&url, 429, "").unwrap();
    assert_eq!(
        clone.get_retry_state(&url).counts.get(&RetryCategory::RateLimit),
        Some(&1)
    );
}
