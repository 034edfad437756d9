//! Process-level settings read from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

pub const SPIDER_VAR: &str = "WORDSCRAPER_SPIDER";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const OUTPUT_VAR: &str = "WORDSCRAPER_OUTPUT";
pub const CONCURRENCY_VAR: &str = "WORDSCRAPER_CONCURRENCY";
pub const START_URL_VAR: &str = "WORDSCRAPER_START_URL";

const DEFAULT_OUTPUT: &str = "data";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown spider '{0}', expected dictionary, jobs, movies or sounds")]
    UnknownSpider(String),
    #[error("Invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("Invalid start URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpiderKind {
    #[default]
    Dictionary,
    Jobs,
    Movies,
    Sounds,
}

impl FromStr for SpiderKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dictionary" | "words" => Ok(SpiderKind::Dictionary),
            "jobs" => Ok(SpiderKind::Jobs),
            "movies" => Ok(SpiderKind::Movies),
            "sounds" => Ok(SpiderKind::Sounds),
            other => Err(SettingsError::UnknownSpider(other.to_string())),
        }
    }
}

impl fmt::Display for SpiderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpiderKind::Dictionary => "dictionary",
            SpiderKind::Jobs => "jobs",
            SpiderKind::Movies => "movies",
            SpiderKind::Sounds => "sounds",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub spider: SpiderKind,
    /// Entry store for the dictionary spider; in-memory when unset.
    pub database_url: Option<String>,
    /// Directory for JSON-lines output of the other spiders.
    pub output: String,
    pub concurrency: Option<usize>,
    pub start_url: Option<Url>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spider: SpiderKind::default(),
            database_url: None,
            output: DEFAULT_OUTPUT.to_string(),
            concurrency: None,
            start_url: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(spider) = get(SPIDER_VAR) {
            settings.spider = spider.parse()?;
        }
        settings.database_url = get(DATABASE_URL_VAR);
        if let Some(output) = get(OUTPUT_VAR) {
            settings.output = output;
        }
        if let Some(value) = get(CONCURRENCY_VAR) {
            let concurrency = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(SettingsError::InvalidNumber {
                    key: CONCURRENCY_VAR,
                    value,
                })?;
            settings.concurrency = Some(concurrency);
        }
        if let Some(url) = get(START_URL_VAR) {
            settings.start_url = Some(Url::parse(url.trim())?);
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.spider, SpiderKind::Dictionary);
        assert_eq!(settings.output, "data");
    }

    #[test]
    fn test_reads_every_variable() {
        let settings = Settings::from_lookup(lookup(&[
            (SPIDER_VAR, "Movies"),
            (DATABASE_URL_VAR, "mysql://root@localhost/words"),
            (OUTPUT_VAR, "out"),
            (CONCURRENCY_VAR, " 8 "),
            (START_URL_VAR, "https://www.ygdy8.net/html/gndy/"),
        ]))
        .unwrap();

        assert_eq!(settings.spider, SpiderKind::Movies);
        assert_eq!(
            settings.database_url.as_deref(),
            Some("mysql://root@localhost/words")
        );
        assert_eq!(settings.output, "out");
        assert_eq!(settings.concurrency, Some(8));
        assert_eq!(
            settings.start_url.unwrap().as_str(),
            "https://www.ygdy8.net/html/gndy/"
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings =
            Settings::from_lookup(lookup(&[(DATABASE_URL_VAR, "  "), (SPIDER_VAR, "")])).unwrap();
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.spider, SpiderKind::Dictionary);
    }

    #[test]
    fn test_reads_sounds_spider() {
        let settings = Settings::from_lookup(lookup(&[(SPIDER_VAR, " SOUNDS ")])).unwrap();
        assert_eq!(settings.spider, SpiderKind::Sounds);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[(SPIDER_VAR, "books")])),
            Err(SettingsError::UnknownSpider(_))
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[(CONCURRENCY_VAR, "0")])),
            Err(SettingsError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup(&[(START_URL_VAR, "not a url")])),
            Err(SettingsError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_spider_kind_display_round_trips() {
        for kind in [
            SpiderKind::Dictionary,
            SpiderKind::Jobs,
            SpiderKind::Movies,
            SpiderKind::Sounds,
        ] {
            assert_eq!(kind.to_string().parse::<SpiderKind>().unwrap(), kind);
        }
    }
}
