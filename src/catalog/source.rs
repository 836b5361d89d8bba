//! Per-mode catalog source with a time-bounded cache.
//!
//! The recommendation cycle always fetches fresh data; reference lookups reuse
//! the cached catalog when one is present. A `CacheSweeper` thread expires
//! stale entries so that a later lookup is forced back to the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::error::{CatalogError, CatalogResult};
use super::extract::CatalogExtractor;
use super::fetch::ContentFetcher;
use super::CatalogEntry;
use crate::mode::Mode;

/// How often a sleeping sweeper checks its shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

// ── SourceUrls ──────────────────────────────────────────────────────────

/// Where each mode's catalog page lives, and how reference links are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    pub main: String,
    pub pbe: String,
    /// Prefix joined with an entry's reference key to form its link.
    pub reference_base: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            main: "https://lolchess.gg/meta".into(),
            pbe: "https://lolchess.gg/meta?pbe=true".into(),
            reference_base: "https://lolchess.gg/builder/guide/".into(),
        }
    }
}

impl SourceUrls {
    pub fn for_mode(&self, mode: Mode) -> &str {
        match mode {
            Mode::Main => &self.main,
            Mode::Pbe => &self.pbe,
        }
    }

    pub fn reference_url(&self, reference_key: &str) -> String {
        if self.reference_base.ends_with('/') {
            format!("{}{reference_key}", self.reference_base)
        } else {
            format!("{}/{reference_key}", self.reference_base)
        }
    }
}

// ── CatalogCache ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CachedCatalog {
    entries: Vec<CatalogEntry>,
    fetched_at: Instant,
}

/// Shared, concurrency-safe catalog cache keyed by mode.
///
/// Cloning is cheap and every clone sees the same entries; the sweeper thread
/// holds one clone while the event loop holds another.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    inner: Arc<DashMap<Mode, CachedCatalog>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mode: Mode) -> Option<Vec<CatalogEntry>> {
        self.inner.get(&mode).map(|c| c.entries.clone())
    }

    pub fn put(&self, mode: Mode, entries: Vec<CatalogEntry>) {
        self.inner.insert(
            mode,
            CachedCatalog {
                entries,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the cached catalog for `mode`. Returns whether one was present.
    pub fn invalidate(&self, mode: Mode) -> bool {
        self.inner.remove(&mode).is_some()
    }

    /// Drop every catalog fetched at least `ttl` ago. Returns how many went.
    pub fn expire_older_than(&self, ttl: Duration) -> usize {
        let mut expired = 0;
        self.inner.retain(|mode, cached| {
            let keep = cached.fetched_at.elapsed() < ttl;
            if !keep {
                expired += 1;
                tracing::debug!(%mode, age_secs = cached.fetched_at.elapsed().as_secs(), "catalog expired");
            }
            keep
        });
        expired
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ── CacheSweeper ────────────────────────────────────────────────────────

/// Background thread that periodically expires stale catalogs.
pub struct CacheSweeper {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Start sweeping `cache` every `interval`, dropping entries older than `ttl`.
    pub fn spawn(cache: CatalogCache, ttl: Duration, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = std::thread::spawn(move || {
            tracing::debug!(ttl_secs = ttl.as_secs(), interval_secs = interval.as_secs(), "cache sweeper started");
            while !flag.load(Ordering::SeqCst) {
                let deadline = Instant::now() + interval;
                loop {
                    let now = Instant::now();
                    if now >= deadline || flag.load(Ordering::SeqCst) {
                        break;
                    }
                    std::thread::sleep(SHUTDOWN_POLL.min(deadline - now));
                }
                if flag.load(Ordering::SeqCst) {
                    break;
                }

                let expired = cache.expire_older_than(ttl);
                if expired > 0 {
                    tracing::info!(expired, "catalog cache swept");
                }
            }
            tracing::debug!("cache sweeper stopped");
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CacheSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSweeper")
            .field("running", &self.is_running())
            .finish()
    }
}

// ── CatalogSource ───────────────────────────────────────────────────────

/// Fetches, extracts and caches each mode's catalog.
pub struct CatalogSource {
    fetcher: Box<dyn ContentFetcher>,
    extractor: CatalogExtractor,
    urls: SourceUrls,
    cache: CatalogCache,
}

impl CatalogSource {
    pub fn new(fetcher: Box<dyn ContentFetcher>, extractor: CatalogExtractor, urls: SourceUrls) -> Self {
        Self {
            fetcher,
            extractor,
            urls,
            cache: CatalogCache::new(),
        }
    }

    /// The shared cache, for handing to a [`CacheSweeper`].
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn urls(&self) -> &SourceUrls {
        &self.urls
    }

    /// Fetch and extract the catalog for `mode`, replacing any cached copy.
    pub fn refresh(&self, mode: Mode) -> CatalogResult<Vec<CatalogEntry>> {
        let url = self.urls.for_mode(mode);
        let page = self.fetcher.fetch(url)?;
        let entries = self.extractor.extract(&page)?;
        tracing::info!(%mode, entries = entries.len(), "catalog refreshed");
        self.cache.put(mode, entries.clone());
        Ok(entries)
    }

    /// The cached catalog for `mode`, fetching it when absent.
    pub fn catalog(&self, mode: Mode) -> CatalogResult<Vec<CatalogEntry>> {
        match self.cache.get(mode) {
            Some(entries) => {
                tracing::debug!(%mode, "catalog cache hit");
                Ok(entries)
            }
            None => self.refresh(mode),
        }
    }

    /// External reference link for the deck called `name`.
    ///
    /// Looks the name up in the cached catalog; a miss against a cached copy
    /// triggers one refresh before giving up.
    pub fn reference_url(&self, mode: Mode, name: &str) -> CatalogResult<String> {
        let was_cached = self.cache.get(mode).is_some();
        let entries = self.catalog(mode)?;

        let entry = match find_by_name(&entries, name) {
            Some(entry) => entry.clone(),
            None if was_cached => {
                let fresh = self.refresh(mode)?;
                find_by_name(&fresh, name)
                    .cloned()
                    .ok_or_else(|| unknown_entry(mode, name))?
            }
            None => return Err(unknown_entry(mode, name)),
        };

        Ok(self.urls.reference_url(&entry.reference_key))
    }
}

fn find_by_name<'a>(entries: &'a [CatalogEntry], name: &str) -> Option<&'a CatalogEntry> {
    entries.iter().find(|e| e.name == name)
}

fn unknown_entry(mode: Mode, name: &str) -> CatalogError {
    CatalogError::UnknownEntry {
        name: name.to_string(),
        mode: mode.to_string(),
    }
}

impl std::fmt::Debug for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSource")
            .field("urls", &self.urls)
            .field("marker", &self.extractor.marker())
            .field("cached_modes", &self.cache.len())
            .finish()
    }
}
