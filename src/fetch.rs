//! Resource fetching.
//!
//! The renderer never talks to a transport directly; everything goes through
//! the [`Fetcher`] seam. [`TemplateCache`] adds the per-render-pass
//! deduplication the composer relies on.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::debug;

use crate::error::{Error, Result};

/// Asynchronous text resource fetcher.
///
/// A non-success response must surface as [`Error::Fetch`]; the composer
/// treats any failure as fatal to the whole resolution.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher backed by reqwest. Relative urls are joined onto a base.
pub struct HttpFetcher {
    client: reqwest::Client,
    base: String,
}

impl HttpFetcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into(),
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let absolute = self.absolute(url);
        let response = self
            .client
            .get(&absolute)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::fetch(&absolute, e))?;
        response.text().await.map_err(|e| Error::fetch(&absolute, e))
    }
}

/// Fetcher serving files under a root directory; used by the CLI for local
/// previews.
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let path = self.root.join(url.trim_start_matches('/'));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::fetch(path.display().to_string(), e))
    }
}

/// Fetcher serving responses from an in-memory map. Useful in tests and for
/// embedded snapshots; counts how often each url is requested.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, String>,
    counts: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the response body for a url.
    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.insert(url.into(), body.into());
    }

    /// How many times a url has been requested.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(url.to_string()).or_insert(0) += 1;
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "404 Not Found"))
    }
}

/// Per-render-pass deduplicating store of fetched template text.
///
/// Entries are immutable once resolved; a url is fetched at most once per
/// pass, including across sibling branches and later resolution levels.
#[derive(Default)]
pub struct TemplateCache {
    entries: HashMap<String, String>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up resolved text for a url.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Fetch every url not yet cached, concurrently, and insert the results.
    /// Any single failure fails the whole call and caches nothing from it.
    pub async fn fetch_all(&mut self, fetcher: &dyn Fetcher, urls: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        let missing: Vec<&str> = urls
            .iter()
            .map(String::as_str)
            .filter(|url| !self.entries.contains_key(*url) && seen.insert(*url))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        debug!(count = missing.len(), "fetching templates");

        let fetched = try_join_all(missing.into_iter().map(|url| async move {
            let text = fetcher.fetch(url).await?;
            Ok::<_, Error>((url.to_string(), text))
        }))
        .await?;

        for (url, text) in fetched {
            self.entries.insert(url, text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_fetches_each_url_once() {
        let mut fetcher = StaticFetcher::new();
        fetcher.insert("a.html", "<p>a</p>");
        fetcher.insert("b.html", "<p>b</p>");

        let mut cache = TemplateCache::new();
        let urls = vec![
            "a.html".to_string(),
            "b.html".to_string(),
            "a.html".to_string(),
        ];
        cache.fetch_all(&fetcher, &urls).await.unwrap();
        // Second pass over the same urls is served from the cache
        cache.fetch_all(&fetcher, &urls).await.unwrap();

        assert_eq!(fetcher.fetch_count("a.html"), 1);
        assert_eq!(fetcher.fetch_count("b.html"), 1);
        assert_eq!(cache.get("a.html"), Some("<p>a</p>"));
    }

    #[tokio::test]
    async fn test_cache_propagates_failure() {
        let mut fetcher = StaticFetcher::new();
        fetcher.insert("ok.html", "<p>ok</p>");

        let mut cache = TemplateCache::new();
        let urls = vec!["ok.html".to_string(), "missing.html".to_string()];
        let err = cache.fetch_all(&fetcher, &urls).await.unwrap_err();

        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_file_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.md"), "# hi").unwrap();

        let fetcher = FileFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("/page.md").await.unwrap(), "# hi");
        assert!(fetcher.fetch("/other.md").await.is_err());
    }

    #[test]
    fn test_http_fetcher_joins_base() {
        let fetcher = HttpFetcher::new("https://example.com/site/");
        assert_eq!(
            fetcher.absolute("/templates/base.html"),
            "https://example.com/site/templates/base.html"
        );
        assert_eq!(
            fetcher.absolute("https://cdn.example.com/x.html"),
            "https://cdn.example.com/x.html"
        );
    }
}
