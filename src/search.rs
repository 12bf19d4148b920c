//! Secondary source: company profiles found through a search API.
//!
//! Appearing in a cohort-phrase search is itself the corroborating signal, so
//! every record from here is marked `corroborated`.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{HttpConfig, SearchConfig};
use crate::fetcher::Fetcher;
use crate::models::Record;
use crate::normalize::clean_text;

/// Title separators, most specific first.
const TITLE_SEPARATORS: &[&str] = &[" | LinkedIn", " - LinkedIn", " | ", " - ", " on LinkedIn"];
const SITE_SUFFIX: &str = "LinkedIn";
const SNIPPET_LIMIT: usize = 200;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Company name from a result title such as `"Acme | LinkedIn"`.
pub fn extract_name_from_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return String::new();
    }

    for separator in TITLE_SEPARATORS {
        if let Some((name, _)) = title.split_once(separator) {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    title.strip_suffix(SITE_SUFFIX).map(str::trim).unwrap_or(title).to_string()
}

/// Removes cohort labels ("YC S25", "(Y Combinator S25)", ...) from names.
#[derive(Debug, Clone)]
pub struct CohortLabels {
    pattern: Option<Regex>,
}

impl CohortLabels {
    pub fn new(labels: &[String]) -> Result<Self, regex::Error> {
        let mut labels: Vec<&str> = labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
        if labels.is_empty() {
            return Ok(Self { pattern: None });
        }
        // Longest first so "Y Combinator S25" wins over a shorter overlapping label.
        labels.sort_by_key(|l| std::cmp::Reverse(l.len()));
        let alternation = labels
            .iter()
            .map(|l| regex::escape(l).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\(\s*(?:{alt})\s*\)|(?:{alt})", alt = alternation))?;
        Ok(Self { pattern: Some(pattern) })
    }

    pub fn strip(&self, name: &str) -> String {
        match &self.pattern {
            Some(pattern) => clean_text(&pattern.replace_all(name, " ")),
            None => clean_text(name),
        }
    }
}

pub struct SearchScraper {
    config: SearchConfig,
    fetcher: Fetcher,
    labels: CohortLabels,
}

impl SearchScraper {
    pub fn new(config: SearchConfig, http: &HttpConfig) -> anyhow::Result<Self> {
        let labels = CohortLabels::new(&config.cohort_labels)?;
        let fetcher = Fetcher::new(http.clone())?;
        Ok(Self { config, fetcher, labels })
    }

    /// Search every configured phrase. Never fails: problems are logged and
    /// whatever was collected (possibly nothing) is returned.
    pub async fn scrape(&self) -> Vec<Record> {
        let (Some(key), Some(engine)) = (&self.config.api_key, &self.config.engine_id) else {
            error!("Search scraping skipped: API key or engine id not configured");
            return Vec::new();
        };

        let mut records = Vec::new();
        for phrase in &self.config.phrases {
            info!("🔎 Searching for profiles with: {}", phrase);
            records.extend(self.search_phrase(key, engine, phrase).await);
            sleep(self.config.phrase_delay).await;
        }

        let unique = dedupe_by_name(records, self.config.max_records);
        info!("✅ Search scraper found {} unique companies", unique.len());
        unique
    }

    fn page_url(&self, key: &str, engine: &str, query: &str, start: u32) -> String {
        format!(
            "{}?key={}&cx={}&q={}&start={}&num={}",
            self.config.api_url,
            urlencoding::encode(key),
            urlencoding::encode(engine),
            urlencoding::encode(query),
            start,
            self.config.page_size,
        )
    }

    async fn search_phrase(&self, key: &str, engine: &str, phrase: &str) -> Vec<Record> {
        let query = format!("{} \"({})\"", self.config.site_filter, phrase);
        let step = self.config.page_size.max(1) as usize;
        let mut records = Vec::new();

        for start in (1..=self.config.max_start).step_by(step) {
            let url = self.page_url(key, engine, &query, start);
            let page = (start - 1) / self.config.page_size.max(1) + 1;

            match self.fetcher.fetch_json::<SearchResponse>(&url, Some(self.config.page_delay)).await {
                Ok(response) => {
                    let found = self.records_from_response(&response);
                    if found.is_empty() {
                        // An empty first page does not end the phrase.
                        if start > 1 {
                            debug!("Page {} for {:?} had no profiles, stopping", page, phrase);
                            break;
                        }
                    } else {
                        records.extend(found);
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("Search API pushed back on page {} for {:?}: {}", page, phrase, e);
                    break;
                }
                Err(e) => {
                    error!("Error reading search page {} for {:?}: {}", page, phrase, e);
                }
            }
        }

        records
    }

    /// Records for the items that link to a company profile.
    pub fn records_from_response(&self, response: &SearchResponse) -> Vec<Record> {
        response
            .items
            .iter()
            .filter(|item| item.link.contains(&self.config.profile_pattern))
            .filter_map(|item| {
                let name = self.labels.strip(&extract_name_from_title(&item.title));
                // Titles that were only a label or a separator leave nothing to match on.
                if !name.chars().any(char::is_alphanumeric) {
                    debug!("Skipping {}: no company name in {:?}", item.link, item.title);
                    return None;
                }
                debug!("Found profile: {} -> {}", name, item.link);
                let snippet: String = clean_text(&item.snippet).chars().take(SNIPPET_LIMIT).collect();
                Some(Record {
                    name,
                    website: None,
                    description: Some(snippet).filter(|s| !s.is_empty()),
                    primary_source_url: None,
                    secondary_source_url: Some(item.link.clone()),
                    corroborated: true,
                })
            })
            .collect()
    }
}

/// Keep the first record per case-insensitive name, at most `limit` of them.
pub fn dedupe_by_name(records: Vec<Record>, limit: usize) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.name.to_lowercase()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn default_labels() -> CohortLabels {
        CohortLabels::new(&SearchConfig::default().cohort_labels).unwrap()
    }

    fn item(title: &str, link: &str) -> serde_json::Value {
        serde_json::json!({ "title": title, "link": link, "snippet": format!("About {title}") })
    }

    fn test_scraper(server: &MockServer, phrases: &[&str], max_records: usize) -> SearchScraper {
        let config = SearchConfig {
            api_url: format!("{}/customsearch/v1", server.uri()),
            api_key: Some("key".to_string()),
            engine_id: Some("cx".to_string()),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            max_records,
            max_start: 31,
            page_delay: Duration::ZERO,
            phrase_delay: Duration::ZERO,
            ..SearchConfig::default()
        };
        let http = HttpConfig {
            request_delay: Duration::ZERO,
            max_retries: 2,
            backoff_unit: Duration::from_millis(5),
            ..HttpConfig::default()
        };
        SearchScraper::new(config, &http).unwrap()
    }

    #[test]
    fn test_extract_company_name_from_title() {
        assert_eq!(extract_name_from_title("Test Company | LinkedIn"), "Test Company");
        assert_eq!(extract_name_from_title("Another Company - LinkedIn"), "Another Company");
        assert_eq!(extract_name_from_title("Simple Company"), "Simple Company");
        assert_eq!(extract_name_from_title(""), "");
        assert_eq!(extract_name_from_title("Acme on LinkedIn"), "Acme");
        assert_eq!(extract_name_from_title("Acme LinkedIn"), "Acme");
        assert_eq!(extract_name_from_title("Acme (YC S25) | Robotics"), "Acme (YC S25)");
    }

    #[test]
    fn test_clean_company_name() {
        let labels = default_labels();
        assert_eq!(labels.strip("Test Company (YC S25)"), "Test Company");
        assert_eq!(labels.strip("Test Company YC S25"), "Test Company");
        assert_eq!(labels.strip("Test Company"), "Test Company");
        assert_eq!(labels.strip(""), "");
        assert_eq!(labels.strip("Acme (y combinator s25)"), "Acme");
        assert_eq!(labels.strip("Acme ( YCombinator S25 )"), "Acme");
        assert_eq!(labels.strip("YC S25 Acme Labs"), "Acme Labs");
    }

    #[test]
    fn test_no_labels_only_collapses_whitespace() {
        let labels = CohortLabels::new(&[]).unwrap();
        assert_eq!(labels.strip(" Acme  YC S25 "), "Acme YC S25");
    }

    #[test]
    fn test_dedupe_by_name_case_insensitive_and_capped() {
        let records = vec![
            Record::named("Acme"),
            Record::named("ACME"),
            Record::named("Beta"),
            Record::named("Gamma"),
        ];
        let unique = dedupe_by_name(records, 2);
        let names: Vec<_> = unique.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Beta"]);
    }

    #[tokio::test]
    async fn test_records_filtered_to_profile_links() {
        let server = MockServer::start().await;
        let scraper = test_scraper(&server, &["YC S25"], 100);
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [
                item("Acme (YC S25) | LinkedIn", "https://www.linkedin.com/company/acme"),
                item("Some post | LinkedIn", "https://www.linkedin.com/posts/someone"),
                { "title": "No link" }
            ]
        }))
        .unwrap();

        let records = scraper.records_from_response(&response);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Acme");
        assert_eq!(records[0].secondary_source_url.as_deref(), Some("https://www.linkedin.com/company/acme"));
        assert_eq!(records[0].description.as_deref(), Some("About Acme (YC S25) | LinkedIn"));
        assert!(records[0].corroborated);
    }

    #[tokio::test]
    async fn test_titles_without_a_name_are_skipped() {
        let server = MockServer::start().await;
        let scraper = test_scraper(&server, &["YC S25"], 100);
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "items": [
                item("YC S25 | LinkedIn", "https://www.linkedin.com/company/yc-s25"),
                item(" | LinkedIn", "https://www.linkedin.com/company/blank"),
                item("(Y Combinator S25) - LinkedIn", "https://www.linkedin.com/company/ycombinator"),
                item("Acme | LinkedIn", "https://www.linkedin.com/company/acme"),
            ]
        }))
        .unwrap();

        let records = scraper.records_from_response(&response);

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme"]);
    }

    #[tokio::test]
    async fn test_snippet_is_truncated() {
        let server = MockServer::start().await;
        let scraper = test_scraper(&server, &["YC S25"], 100);
        let response = SearchResponse {
            items: vec![SearchItem {
                title: "Acme | LinkedIn".to_string(),
                link: "https://www.linkedin.com/company/acme".to_string(),
                snippet: "x".repeat(500),
            }],
        };
        let records = scraper.records_from_response(&response);
        assert_eq!(records[0].description.as_ref().map(|d| d.len()), Some(SNIPPET_LIMIT));
    }

    #[tokio::test]
    async fn test_scrape_pages_until_empty_and_dedupes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    item("Acme | LinkedIn", "https://www.linkedin.com/company/acme"),
                    item("Beta YC S25 | LinkedIn", "https://www.linkedin.com/company/beta"),
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [ item("ACME | LinkedIn", "https://www.linkedin.com/company/acme-2") ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [ item("Never | LinkedIn", "https://www.linkedin.com/company/never") ]
            })))
            .expect(0)
            .mount(&server)
            .await;

        let scraper = test_scraper(&server, &["YC S25", "Y Combinator S25"], 100);
        let records = scraper.scrape().await;

        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Beta"]);
        assert_eq!(records[0].secondary_source_url.as_deref(), Some("https://www.linkedin.com/company/acme"));
    }

    #[tokio::test]
    async fn test_empty_first_page_keeps_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [ item("Acme | LinkedIn", "https://www.linkedin.com/company/acme") ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })))
            .mount(&server)
            .await;

        let scraper = test_scraper(&server, &["YC S25"], 100);
        let records = scraper.scrape().await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_phrase_stops_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .respond_with(ResponseTemplate::new(429))
            // two attempts on the first page, then the phrase is abandoned
            .expect(2)
            .mount(&server)
            .await;

        let scraper = test_scraper(&server, &["YC S25"], 100);
        assert!(scraper.scrape().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_empty() {
        let server = MockServer::start().await;
        let mut scraper = test_scraper(&server, &["YC S25"], 100);
        scraper.config.api_key = None;
        assert!(scraper.scrape().await.is_empty());
    }
}
