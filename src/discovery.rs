//! Incremental discovery of detail-page links on an infinite-scroll listing.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Url;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browser::ContentSource;
use crate::fetcher::FetchError;

/// Upper bound on scroll iterations.
pub const MAX_SCROLLS: usize = 20;
/// Consecutive iterations without growth before the list counts as fully loaded.
pub const STABLE_ITERATIONS: usize = 2;
pub const SETTLE_TIME: Duration = Duration::from_millis(500);

/// Recognizes detail-page links: same host as the directory, exactly one path
/// segment below the directory path.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base: Url,
    prefix: String,
}

impl LinkFilter {
    /// `directory_url` is the listing root, e.g. `https://www.ycombinator.com/companies`.
    pub fn new(directory_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(directory_url)?;
        let prefix = format!("{}/", base.path().trim_end_matches('/'));
        Ok(Self { base, prefix })
    }

    /// CSS selector for anchors that may point at detail pages.
    pub fn anchor_selector(&self) -> String {
        format!("a[href*=\"{}\"]", self.prefix)
    }

    /// Absolute detail URL for `href`, or `None` when it is not a detail link.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let mut url = self.base.join(href.trim()).ok()?;
        if url.host_str() != self.base.host_str() {
            return None;
        }
        let slug = url.path().strip_prefix(&self.prefix)?.trim_end_matches('/');
        if slug.is_empty() || slug.contains('/') {
            return None;
        }
        let path = format!("{}{}", self.prefix, slug);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Some(url.to_string())
    }

    /// Distinct detail links in `markup`, in document order.
    pub fn detail_links(&self, markup: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let document = Html::parse_document(markup);
        let mut seen = HashSet::new();
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| self.resolve(href))
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }
}

/// Scroll `source` until the set of detail links stops growing.
///
/// Links accumulate across snapshots, so rows a virtualized list unmounts while
/// scrolling are kept. Stops after [`STABLE_ITERATIONS`] iterations without
/// growth, after [`MAX_SCROLLS`] iterations, or once `cap` links are known.
pub async fn discover_links<C>(source: &mut C, filter: &LinkFilter, cap: Option<usize>) -> Result<Vec<String>, FetchError>
where
    C: ContentSource + ?Sized,
{
    let mut links: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut previous_count = 0;
    let mut stable_iterations = 0;

    for scroll in 1..=MAX_SCROLLS {
        source.trigger_more_content()?;
        sleep(SETTLE_TIME).await;

        let markup = source.current_markup()?;
        for link in filter.detail_links(&markup) {
            if cap.is_some_and(|cap| links.len() >= cap) {
                break;
            }
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }

        let count = links.len();
        debug!("Scroll {}: {} distinct detail links", scroll, count);

        if cap.is_some_and(|cap| count >= cap) {
            info!("Reached link cap of {} after {} scrolls", count, scroll);
            break;
        }

        if count > previous_count {
            previous_count = count;
            stable_iterations = 0;
        } else {
            stable_iterations += 1;
        }

        if stable_iterations >= STABLE_ITERATIONS {
            info!("Link count stable at {} after {} scrolls", count, scroll);
            break;
        }
    }

    Ok(links)
}
