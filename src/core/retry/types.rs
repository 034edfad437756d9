use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Matches a response body, either as a case-insensitive substring or as a
/// regular expression compiled when the condition is built.
#[derive(Debug, Clone)]
pub enum ContentRetryCondition {
    Text(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub enum RetryCondition {
    StatusCode(u16),
    /// Inclusive on both ends.
    StatusRange(u16, u16),
    Content(ContentRetryCondition),
}

#[derive(Debug, Clone, Copy)]
pub enum BackoffPolicy {
    Constant,
    Linear,
    Exponential { factor: f32 },
}

/// Retry budgets are counted per category and URL.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RetryCategory {
    RateLimit,
    ServerError,
    /// Captcha or verification pages served with a success status.
    BotDetection,
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_policy: BackoffPolicy,
    pub conditions: Vec<RetryCondition>,
}

#[derive(Debug, Clone, Default)]
pub struct RetryState {
    pub counts: HashMap<RetryCategory, usize>,
    pub total_retries: usize,
}

/// Retry rules per category, plus the per-URL attempt counters they consume.
///
/// Clones share the counters, so a config handed to several fetch tasks
/// still caps the total retries for a URL.
#[derive(Debug, Clone, Default)]
pub struct RetryConfig {
    pub categories: HashMap<RetryCategory, CategoryConfig>,
    pub(crate) retry_states: Arc<RwLock<HashMap<String, RetryState>>>,
}
