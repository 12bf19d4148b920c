//! Browser capability used by the directory scraper.
//!
//! Discovery only needs [`ContentSource`]; the per-page batch also navigates and
//! waits for selectors through [`BrowserSession`]. [`ChromeSession`] implements
//! both on top of `headless_chrome`.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::config::DirectoryConfig;
use crate::fetcher::{FailureKind, FetchError};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// A page whose content grows when asked to.
pub trait ContentSource {
    /// Ask the page to render more content (scroll to the bottom).
    fn trigger_more_content(&mut self) -> Result<(), FetchError>;

    /// Markup as currently rendered.
    fn current_markup(&mut self) -> Result<String, FetchError>;
}

pub trait BrowserSession: ContentSource + Send {
    /// Navigate and wait for the load to finish.
    fn open(&mut self, url: &str) -> Result<(), FetchError>;

    /// Whether an element matching `selector` shows up within `timeout`.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool;
}

pub struct ChromeSession {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
    current_url: String,
}

impl ChromeSession {
    pub fn launch(config: &DirectoryConfig, user_agent: &str) -> anyhow::Result<Self> {
        let ua_arg = format!("--user-agent={}", user_agent);
        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-infobars"),
        ];
        args.push(OsStr::new(&ua_arg));

        let browser = Browser::new(LaunchOptions {
            headless: config.headless,
            window_size: Some((1920, 1080)),
            args,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;
        tab.set_default_timeout(config.page_load_timeout);
        crate::stealth::apply_stealth(&tab, "en-US")?;
        info!("🌐 Browser session ready (headless: {})", config.headless);

        Ok(Self {
            _browser: browser,
            tab,
            current_url: String::new(),
        })
    }
}

impl ContentSource for ChromeSession {
    fn trigger_more_content(&mut self) -> Result<(), FetchError> {
        self.tab
            .evaluate(SCROLL_TO_BOTTOM, false)
            .map(|_| ())
            .map_err(|e| FetchError::browser(&self.current_url, FailureKind::Transient, e))
    }

    fn current_markup(&mut self) -> Result<String, FetchError> {
        self.tab
            .get_content()
            .map_err(|e| FetchError::browser(&self.current_url, FailureKind::Transient, e))
    }
}

impl BrowserSession for ChromeSession {
    fn open(&mut self, url: &str) -> Result<(), FetchError> {
        self.current_url = url.to_string();
        debug!("Navigating to: {}", url);
        // Navigation failures are page-load timeouts or a refused connection.
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| FetchError::browser(url, FailureKind::RateLimited, e))
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> bool {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .is_ok()
    }
}
