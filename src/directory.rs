//! Primary source: the JS-rendered company directory.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserSession, ChromeSession};
use crate::config::{DirectoryConfig, HttpConfig};
use crate::discovery::{discover_links, LinkFilter};
use crate::extract::{extract_company, DETAIL_COMPONENT};
use crate::fetcher::FetchError;
use crate::models::Record;

/// How long to wait for the first listing link before scrolling anyway.
const FIRST_LINK_WAIT: Duration = Duration::from_secs(1);
/// How long to wait for the detail payload to hydrate.
const DETAIL_WAIT: Duration = Duration::from_secs(1);
const HYDRATION_GRACE: Duration = Duration::from_secs(2);
const FAILED_PAGE_PAUSE: Duration = Duration::from_secs(1);

/// Pause after every page, in seconds.
const PAGE_PAUSE_SECS: Range<f64> = 0.3..1.3;
/// Extra pause after every [`LONG_PAUSE_EVERY`] pages, in seconds.
const LONG_PAUSE_SECS: Range<f64> = 0.2..1.5;
const LONG_PAUSE_EVERY: usize = 10;

/// Result of a detail-page batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Complete(Vec<Record>),
    /// The source pushed back; holds everything collected before that.
    LimitExceeded(Vec<Record>),
}

impl BatchOutcome {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            BatchOutcome::Complete(records) | BatchOutcome::LimitExceeded(records) => records,
        }
    }
}

/// Whether the page at 0-based index `visited` is followed by the extra pause.
fn long_pause_due(visited: usize) -> bool {
    (visited + 1) % LONG_PAUSE_EVERY == 0
}

fn random_pause(range: Range<f64>) -> Duration {
    let secs = rand::thread_rng().gen_range(range);
    Duration::from_secs_f64(secs)
}

pub struct DirectoryScraper {
    config: DirectoryConfig,
    user_agent: String,
    links: LinkFilter,
}

impl DirectoryScraper {
    pub fn new(config: DirectoryConfig, http: &HttpConfig) -> anyhow::Result<Self> {
        let links = LinkFilter::new(&config.base_url)?;
        Ok(Self {
            config,
            user_agent: http.user_agent.clone(),
            links,
        })
    }

    /// Listing URL with the batch filter applied.
    pub fn listing_url(&self) -> String {
        match &self.config.batch_filter {
            Some(batch) => format!("{}?batch={}", self.config.base_url, urlencoding::encode(batch)),
            None => self.config.base_url.clone(),
        }
    }

    /// Launch a browser and scrape the directory. Never fails: problems are
    /// logged and whatever was collected (possibly nothing) is returned.
    pub async fn scrape(&self) -> Vec<Record> {
        let mut session = match ChromeSession::launch(&self.config, &self.user_agent) {
            Ok(session) => session,
            Err(e) => {
                error!("Directory scraping failed, browser did not start: {}", e);
                return Vec::new();
            }
        };
        self.scrape_with(&mut session).await
    }

    pub async fn scrape_with<S: BrowserSession>(&self, session: &mut S) -> Vec<Record> {
        let listing = self.listing_url();
        info!("📂 Opening directory listing: {}", listing);
        if let Err(e) = session.open(&listing) {
            error!("Directory scraping failed, listing did not load: {}", e);
            return Vec::new();
        }

        if session.wait_for(&self.links.anchor_selector(), FIRST_LINK_WAIT) {
            debug!("Found links to detail pages");
        } else {
            warn!("No detail links visible yet on {}", listing);
        }

        let links = match discover_links(session, &self.links, self.config.max_records).await {
            Ok(links) => links,
            Err(e) => {
                error!("Directory scraping failed while loading the listing: {}", e);
                return Vec::new();
            }
        };
        info!("Discovered {} detail pages", links.len());

        let records = match self.scrape_detail_pages(session, &links).await {
            BatchOutcome::Complete(records) => records,
            BatchOutcome::LimitExceeded(records) => {
                warn!("Directory scraping stopped early by request limits with {} records", records.len());
                records
            }
        };
        info!("✅ Directory scraper completed with {} records", records.len());
        records
    }

    /// Visit each detail page in order, pausing irregularly between pages.
    pub async fn scrape_detail_pages<S: BrowserSession>(&self, session: &mut S, links: &[String]) -> BatchOutcome {
        let mut records = Vec::new();

        for (visited, url) in links.iter().enumerate() {
            match self.scrape_detail_page(session, url).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => warn!("No company data extracted from {}", url),
                Err(e) if e.is_rate_limited() => {
                    error!("Request limits or connection issues on {}: {}", url, e);
                    return BatchOutcome::LimitExceeded(records);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    sleep(FAILED_PAGE_PAUSE).await;
                }
            }

            sleep(random_pause(PAGE_PAUSE_SECS)).await;
            if long_pause_due(visited) {
                sleep(random_pause(LONG_PAUSE_SECS)).await;
            }
        }

        debug!("Finished scraping {} detail pages", links.len());
        BatchOutcome::Complete(records)
    }

    async fn scrape_detail_page<S: BrowserSession>(&self, session: &mut S, url: &str) -> Result<Option<Record>, FetchError> {
        session.open(url)?;

        let payload_selector = format!("[data-page*=\"{}\"]", DETAIL_COMPONENT);
        if !session.wait_for(&payload_selector, DETAIL_WAIT) {
            warn!("Page components may not have loaded for {}", url);
            sleep(HYDRATION_GRACE).await;
        }

        let html = session.current_markup()?;
        Ok(extract_company(&html, url, &self.config.base_url))
    }
}
