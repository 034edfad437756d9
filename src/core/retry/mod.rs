mod policy;
mod types;

pub use types::{
    BackoffPolicy, CategoryConfig, ContentRetryCondition, RetryCategory, RetryCondition,
    RetryConfig, RetryState,
};

#[cfg(test)]
mod tests;
