//! One harvest run (directory, then search, then reconcile) and the cached
//! result served over HTTP.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::config::Config;
use crate::directory::DirectoryScraper;
use crate::models::Record;
use crate::reconcile::reconcile;
use crate::search::SearchScraper;

/// Receives stage progress of a harvest run.
pub trait HarvestObserver: Send + Sync {
    fn on_progress(&self, percent: u8, message: &str);
}

/// Reports progress as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl HarvestObserver for LogObserver {
    fn on_progress(&self, percent: u8, message: &str) {
        info!("📊 [{:>3}%] {}", percent, message);
    }
}

/// Await `primary`, then `secondary`, and reconcile the two.
///
/// The futures are lazy, so the secondary source does not start until the
/// primary one has finished.
pub async fn harvest<P, S>(primary: P, secondary: S, observer: &dyn HarvestObserver) -> Vec<Record>
where
    P: Future<Output = Vec<Record>>,
    S: Future<Output = Vec<Record>>,
{
    observer.on_progress(20, "Scraping company directory...");
    let primary = primary.await;
    info!("Directory returned {} records", primary.len());

    observer.on_progress(50, "Searching for company profiles...");
    let secondary = secondary.await;
    info!("Search returned {} records", secondary.len());

    observer.on_progress(70, "Merging sources...");
    let records = reconcile(primary, secondary);

    observer.on_progress(85, "Preparing results...");
    let corroborated = records.iter().filter(|r| r.corroborated).count();

    observer.on_progress(
        100,
        &format!("Found {} companies, {} corroborated", records.len(), corroborated),
    );
    records
}

/// A cached value and when it was produced.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub fetched_at: DateTime<Utc>,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            fetched_at: self.fetched_at,
            value: Arc::clone(&self.value),
        }
    }
}

/// Holds one value for `ttl`. Loads are serialized: callers that arrive while
/// a load is running wait for it and share its result.
pub struct ResultCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Snapshot<T>)>>,
}

impl<T> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, loading it first when missing or older than the TTL.
    pub async fn get_or_refresh<F, Fut>(&self, load: F) -> Snapshot<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((loaded_at, snapshot)) = slot.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return snapshot.clone();
            }
            info!("Cached result expired, reloading");
        }
        Self::fill(&mut slot, load).await
    }

    /// Load unconditionally and replace the cached value.
    pub async fn refresh<F, Fut>(&self, load: F) -> Snapshot<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        Self::fill(&mut slot, load).await
    }

    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    async fn fill<F, Fut>(slot: &mut Option<(Instant, Snapshot<T>)>, load: F) -> Snapshot<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let value = load().await;
        let snapshot = Snapshot {
            fetched_at: Utc::now(),
            value: Arc::new(value),
        };
        *slot = Some((Instant::now(), snapshot.clone()));
        snapshot
    }
}

pub struct Pipeline {
    directory: DirectoryScraper,
    search: SearchScraper,
    observer: Arc<dyn HarvestObserver>,
    cache: ResultCache<Vec<Record>>,
}

impl Pipeline {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            directory: DirectoryScraper::new(config.directory.clone(), &config.http)?,
            search: SearchScraper::new(config.search.clone(), &config.http)?,
            observer: Arc::new(LogObserver),
            cache: ResultCache::new(config.server.cache_ttl),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn HarvestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run both sources and reconcile, bypassing the cache.
    pub async fn run(&self) -> Vec<Record> {
        let started = Instant::now();
        let records = harvest(self.directory.scrape(), self.search.scrape(), self.observer.as_ref())
            .instrument(info_span!("harvest"))
            .await;
        info!("✅ Harvest finished in {:?} with {} records", started.elapsed(), records.len());
        records
    }

    /// Cached records, harvesting when the cache is empty or stale.
    pub async fn companies(&self) -> Snapshot<Vec<Record>> {
        self.cache.get_or_refresh(|| self.run()).await
    }

    /// Drop the cached records and harvest again.
    pub async fn refresh(&self) -> Snapshot<Vec<Record>> {
        self.cache.refresh(|| self.run()).await
    }
}
