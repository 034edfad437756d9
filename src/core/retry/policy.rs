use super::types::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use url::Url;

static RATE_LIMIT_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new("rate limit|too many requests").expect("static regex"));

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_policy: BackoffPolicy::Exponential { factor: 2.0 },
            conditions: Vec::new(),
        }
    }
}

impl RetryCondition {
    pub fn matches(&self, status: u16, content: &str) -> bool {
        match self {
            RetryCondition::StatusCode(code) => *code == status,
            RetryCondition::StatusRange(low, high) => (*low..=*high).contains(&status),
            RetryCondition::Content(condition) => condition.matches(content),
        }
    }
}

impl ContentRetryCondition {
    pub fn text(pattern: impl Into<String>) -> Self {
        ContentRetryCondition::Text(pattern.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(ContentRetryCondition::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, content: &str) -> bool {
        match self {
            ContentRetryCondition::Text(pattern) => content
                .to_lowercase()
                .contains(&pattern.to_lowercase()),
            ContentRetryCondition::Regex(re) => re.is_match(content),
        }
    }
}

impl CategoryConfig {
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let delay = match self.backoff_policy {
            BackoffPolicy::Constant => self.initial_delay,
            BackoffPolicy::Linear => self.initial_delay.mul_f32(attempt as f32),
            BackoffPolicy::Exponential { factor } => {
                self.initial_delay.mul_f32(factor.powi(attempt as i32))
            }
        };

        std::cmp::min(delay, self.max_delay)
    }
}

impl RetryConfig {
    /// A conservative default for public sites: back off on 429 and 5xx.
    pub fn polite() -> Self {
        let mut config = Self::default();
        config.categories.insert(
            RetryCategory::RateLimit,
            CategoryConfig {
                max_retries: 5,
                conditions: vec![
                    RetryCondition::StatusCode(429),
                    RetryCondition::Content(ContentRetryCondition::Regex(
                        RATE_LIMIT_MESSAGE.clone(),
                    )),
                ],
                ..CategoryConfig::default()
            },
        );
        config.categories.insert(
            RetryCategory::ServerError,
            CategoryConfig {
                max_retries: 3,
                conditions: vec![RetryCondition::StatusRange(500, 599)],
                backoff_policy: BackoffPolicy::Linear,
                ..CategoryConfig::default()
            },
        );
        config
    }

    /// Records an attempt and returns the delay before the next one, or
    /// `None` when no category applies or the matching ones are exhausted.
    pub fn should_retry(
        &self,
        url: &Url,
        status: u16,
        content: &str,
    ) -> Option<(RetryCategory, Duration)> {
        let mut states = self.retry_states.write();
        let state = states.entry(url.to_string()).or_default();

        for (category, config) in &self.categories {
            let current_retries = state.counts.get(category).copied().unwrap_or(0);
            if current_retries >= config.max_retries {
                continue;
            }

            if config
                .conditions
                .iter()
                .any(|condition| condition.matches(status, content))
            {
                state.counts.insert(category.clone(), current_retries + 1);
                state.total_retries += 1;
                return Some((category.clone(), config.calculate_delay(current_retries)));
            }
        }
        None
    }

    pub fn get_retry_state(&self, url: &Url) -> RetryState {
        self.retry_states
            .read()
            .get(url.as_str())
            .cloned()
            .unwrap_or_default()
    }
}
