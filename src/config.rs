//! Runtime configuration.
//!
//! Everything is read from `COHORT_*` environment variables (a `.env` file is
//! honoured through `dotenv`). Unset or unparsable values fall back to the
//! defaults below, which target the YC Summer 2025 directory and the Google
//! Custom Search API.

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub directory: DirectoryConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

/// Shared outbound client identity and retry policy.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Courtesy delay slept before every fetch unless the caller overrides it.
    pub request_delay: Duration,
    /// Total attempts per fetch.
    pub max_retries: u32,
    pub timeout: Duration,
    /// Backoff after failed attempt `n` is `2^n` of these.
    pub backoff_unit: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Listing page and prefix of every detail page, e.g. `https://www.ycombinator.com/companies`.
    pub base_url: String,
    /// Value of the `batch` query parameter, unencoded.
    pub batch_filter: Option<String>,
    pub max_records: Option<usize>,
    pub headless: bool,
    pub page_load_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
    pub site_filter: String,
    /// Substring a result link must contain to count as a company profile.
    pub profile_pattern: String,
    pub phrases: Vec<String>,
    /// Cohort labels stripped from derived names.
    pub cohort_labels: Vec<String>,
    pub max_records: usize,
    pub page_size: u32,
    /// Highest `start` offset requested per phrase.
    pub max_start: u32,
    pub page_delay: Duration,
    pub phrase_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub cache_ttl: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: Duration::from_secs(2),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ycombinator.com/companies".to_string(),
            batch_filter: Some("Summer 2025".to_string()),
            max_records: Some(100),
            headless: true,
            page_load_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: None,
            engine_id: None,
            site_filter: "site:linkedin.com/company".to_string(),
            profile_pattern: "linkedin.com/company/".to_string(),
            phrases: vec!["YC S25".to_string(), "Y Combinator S25".to_string()],
            cohort_labels: vec![
                "YC S25".to_string(),
                "Y Combinator S25".to_string(),
                "YCombinator S25".to_string(),
            ],
            max_records: 100,
            page_size: 10,
            max_start: 91,
            page_delay: Duration::from_millis(500),
            phrase_delay: Duration::from_secs(1),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            directory: DirectoryConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            user_agent: env_or("COHORT_USER_AGENT", http_defaults.user_agent),
            request_delay: env_secs("COHORT_REQUEST_DELAY_SECS", http_defaults.request_delay),
            max_retries: env_or("COHORT_MAX_RETRIES", http_defaults.max_retries),
            timeout: env_secs("COHORT_TIMEOUT_SECS", http_defaults.timeout),
            backoff_unit: http_defaults.backoff_unit,
        };

        let dir_defaults = DirectoryConfig::default();
        let directory = DirectoryConfig {
            base_url: env_or("COHORT_DIRECTORY_URL", dir_defaults.base_url),
            batch_filter: match std::env::var("COHORT_BATCH_FILTER") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v.trim().to_string()),
                Err(_) => dir_defaults.batch_filter,
            },
            max_records: match std::env::var("COHORT_MAX_DIRECTORY_RECORDS") {
                Ok(v) if v.trim() == "0" => None,
                Ok(v) => v.trim().parse().ok().or(dir_defaults.max_records),
                Err(_) => dir_defaults.max_records,
            },
            headless: env_or("COHORT_HEADLESS", dir_defaults.headless),
            page_load_timeout: env_secs("COHORT_PAGE_LOAD_TIMEOUT_SECS", dir_defaults.page_load_timeout),
        };

        let search_defaults = SearchConfig::default();
        let search = SearchConfig {
            api_url: env_or("COHORT_SEARCH_API_URL", search_defaults.api_url),
            api_key: env_opt("COHORT_SEARCH_API_KEY"),
            engine_id: env_opt("COHORT_SEARCH_ENGINE_ID"),
            site_filter: env_or("COHORT_SEARCH_SITE_FILTER", search_defaults.site_filter),
            profile_pattern: env_or("COHORT_PROFILE_PATTERN", search_defaults.profile_pattern),
            phrases: env_list("COHORT_SEARCH_PHRASES").unwrap_or(search_defaults.phrases),
            cohort_labels: env_list("COHORT_LABELS").unwrap_or(search_defaults.cohort_labels),
            max_records: env_or("COHORT_MAX_SEARCH_RECORDS", search_defaults.max_records),
            ..search_defaults
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind_addr: env_or("COHORT_BIND_ADDR", server_defaults.bind_addr),
            cache_ttl: env_secs("COHORT_CACHE_TTL_SECS", server_defaults.cache_ttl),
        };

        Self { http, directory, search, server }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Comma-separated list; `None` when unset or empty.
fn env_list(key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = std::env::var(key)
        .ok()?
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
