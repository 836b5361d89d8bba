//! Raw page retrieval.
//!
//! `ContentFetcher` is the seam between the catalog core and the network.
//! - `HttpFetcher` uses `ureq` for sync HTTP, with a timeout and optional
//!   bounded retries.
//! - `StaticFetcher` serves pages from memory for tests and offline extraction.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::{FetchError, FetchResult};

/// Upper bound on a page body (the hydration payload can be a few MB).
const MAX_PAGE_BYTES: u64 = 32 * 1024 * 1024;

/// Fetches raw page content. One call is one logical fetch.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FetchResult<String>;
}

// ── HttpFetcher ─────────────────────────────────────────────────────────

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherOptions {
    pub timeout: Duration,
    /// Extra attempts after the first one fails. Zero means a single attempt.
    pub retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 0,
            retry_delay: Duration::from_millis(500),
            user_agent: concat!("deck-scout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP GET fetcher backed by a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
    options: HttpFetcherOptions,
}

impl HttpFetcher {
    pub fn new(options: HttpFetcherOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build();
        Self { agent, options }
    }

    fn fetch_once(&self, url: &str) -> FetchResult<String> {
        match self.agent.get(url).call() {
            Ok(response) => {
                let mut body = String::new();
                response
                    .into_reader()
                    .take(MAX_PAGE_BYTES)
                    .read_to_string(&mut body)
                    .map_err(|e| FetchError::Body {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, _)) => Err(FetchError::Status {
                url: url.to_string(),
                code,
            }),
            Err(ureq::Error::Transport(transport)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(HttpFetcherOptions::default())
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchResult<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(body) => {
                    tracing::debug!(url, bytes = body.len(), attempt, "page fetched");
                    return Ok(body);
                }
                Err(e) if attempt < self.options.retries => {
                    attempt += 1;
                    tracing::warn!(url, attempt, error = %e, "fetch failed, retrying");
                    std::thread::sleep(self.options.retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("options", &self.options)
            .finish()
    }
}

// ── StaticFetcher ───────────────────────────────────────────────────────

/// In-memory fetcher: serves registered pages by exact URL and counts calls.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Number of `fetch` calls so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ContentFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> FetchResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotServed {
                url: url.to_string(),
            })
    }
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for std::sync::Arc<T> {
    fn fetch(&self, url: &str) -> FetchResult<String> {
        (**self).fetch(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_fetcher_serves_registered_pages() {
        let fetcher = StaticFetcher::new().with_page("https://example.test/meta", "<html/>");
        assert_eq!(fetcher.fetch("https://example.test/meta").unwrap(), "<html/>");
        assert!(matches!(
            fetcher.fetch("https://example.test/other"),
            Err(FetchError::NotServed { .. })
        ));
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn http_fetcher_rejects_non_http_urls() {
        let fetcher = HttpFetcher::default();
        let err = fetcher.fetch("ftp://example.test/meta").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn default_options_make_a_single_attempt() {
        let options = HttpFetcherOptions::default();
        assert_eq!(options.retries, 0);
        assert!(options.user_agent.starts_with("deck-scout/"));
    }
}
