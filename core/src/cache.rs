//! Disk-backed HTTP response cache, keyed by request URL.
//!
//! # Design
//! One JSON file per URL, named by the URL's UUID v5 so arbitrary URLs map to
//! short, filesystem-safe names. Freshness comes from `Cache-Control:
//! max-age`; stale entries that carry an `ETag` or `Last-Modified` are
//! revalidated with a conditional request instead of being refetched in full.
//!
//! Writes go through a temporary file and a rename, so a concurrent reader
//! sees either the old entry or the new one. Stores and evictions are
//! serialised by `write_lock`; lookups take no lock.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::http::HttpResponse;

const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDirectives {
    pub no_store: bool,
    pub no_cache: bool,
    pub max_age: Option<u64>,
}

impl CacheDirectives {
    pub fn parse(header: Option<&str>) -> Self {
        let mut directives = Self::default();
        for token in header.unwrap_or_default().split(',') {
            let token = token.trim().to_ascii_lowercase();
            match token.split_once('=') {
                Some(("max-age", value)) => {
                    directives.max_age = value.trim_matches('"').parse().ok();
                }
                None if token == "no-store" => directives.no_store = true,
                None if token == "no-cache" => directives.no_cache = true,
                _ => {}
            }
        }
        directives
    }
}

/// A stored response plus what is needed to judge and revalidate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub stored_at: u64,
    pub max_age: u64,
    pub no_cache: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: u64) -> bool {
        !self.no_cache && now.saturating_sub(self.stored_at) < self.max_age
    }

    /// Conditional-request headers, empty when the entry has no validator.
    pub fn validators(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(etag) = &self.etag {
            headers.push(("if-none-match".to_string(), etag.clone()));
        }
        if let Some(last_modified) = &self.last_modified {
            headers.push(("if-modified-since".to_string(), last_modified.clone()));
        }
        headers
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Serve without touching the network.
    Fresh(HttpResponse),
    /// Revalidate with `entry.validators()`.
    Stale(CacheEntry),
    Miss,
}

#[derive(Debug)]
pub struct ResponseCache {
    directory: PathBuf,
    max_size_bytes: u64,
    write_lock: Mutex<()>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            max_size_bytes: config.max_size_bytes,
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn entry_path(&self, url: &str) -> PathBuf {
        let key = Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes());
        self.directory.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    pub async fn lookup(&self, url: &str) -> Result<CacheLookup, CacheError> {
        let Some(entry) = self.read_entry(url).await? else {
            return Ok(CacheLookup::Miss);
        };
        if entry.is_fresh(now_secs()) {
            debug!(url, "cache hit");
            return Ok(CacheLookup::Fresh(entry.to_response()));
        }
        if entry.etag.is_some() || entry.last_modified.is_some() {
            debug!(url, "cache entry stale, revalidating");
            return Ok(CacheLookup::Stale(entry));
        }
        Ok(CacheLookup::Miss)
    }

    /// Stores a successful response if its headers allow it. Returns whether
    /// anything was written.
    pub async fn store(&self, url: &str, response: &HttpResponse) -> Result<bool, CacheError> {
        if !response.is_success() {
            return Ok(false);
        }
        let directives = CacheDirectives::parse(response.header("cache-control"));
        let etag = response.header("etag").map(str::to_string);
        let last_modified = response.header("last-modified").map(str::to_string);
        let max_age = directives.max_age.unwrap_or(0);
        let revalidatable = etag.is_some() || last_modified.is_some();
        if directives.no_store || (max_age == 0 && !revalidatable) {
            debug!(url, "response not cacheable");
            return Ok(false);
        }

        let entry = CacheEntry {
            url: url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: now_secs(),
            max_age,
            no_cache: directives.no_cache,
            etag,
            last_modified,
        };
        self.write_entry(&entry).await
    }

    /// Handles a `304 Not Modified`: refreshes the stale entry's freshness
    /// from the revalidation headers and returns the cached response.
    pub async fn refresh(
        &self,
        mut entry: CacheEntry,
        not_modified: &HttpResponse,
    ) -> Result<HttpResponse, CacheError> {
        let directives = CacheDirectives::parse(not_modified.header("cache-control"));
        if let Some(max_age) = directives.max_age {
            entry.max_age = max_age;
        }
        if let Some(etag) = not_modified.header("etag") {
            entry.etag = Some(etag.to_string());
        }
        entry.stored_at = now_secs();
        let response = entry.to_response();
        self.write_entry(&entry).await?;
        Ok(response)
    }

    /// Total bytes of all entries on disk.
    pub async fn size_bytes(&self) -> Result<u64, CacheError> {
        Ok(self.list_entries().await?.iter().map(|e| e.len).sum())
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        for entry in self.list_entries().await? {
            remove_file(&entry.path).await?;
        }
        Ok(())
    }

    async fn read_entry(&self, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(url);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        match serde_json::from_slice::<CacheEntry>(&raw) {
            // A UUID v5 collision is not worth handling beyond this check.
            Ok(entry) if entry.url == url => Ok(Some(entry)),
            Ok(_) => Ok(None),
            Err(source) => {
                warn!(path = %path.display(), "dropping corrupt cache entry");
                let _guard = self.write_lock.lock().await;
                remove_file(&path).await?;
                Err(CacheError::Corrupt { path, source })
            }
        }
    }

    async fn write_entry(&self, entry: &CacheEntry) -> Result<bool, CacheError> {
        let raw = serde_json::to_vec(entry).map_err(|source| CacheError::Corrupt {
            path: self.entry_path(&entry.url),
            source,
        })?;
        if raw.len() as u64 > self.max_size_bytes {
            debug!(url = %entry.url, bytes = raw.len(), "response larger than cache, skipping");
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| CacheError::Io {
                path: self.directory.clone(),
                source,
            })?;
        let path = self.entry_path(&entry.url);
        let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        if let Err(source) = tokio::fs::write(&tmp, &raw).await {
            discard_temp(&tmp).await;
            return Err(CacheError::Io { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            discard_temp(&tmp).await;
            return Err(CacheError::Io { path, source });
        }
        debug!(url = %entry.url, bytes = raw.len(), "cached response");
        self.evict_locked(&path).await?;
        Ok(true)
    }

    /// Drops the least recently written entries until the cache fits, never
    /// `keep`. Caller holds `write_lock`.
    async fn evict_locked(&self, keep: &Path) -> Result<(), CacheError> {
        let entries = self.list_entries().await?;
        let mut total: u64 = entries.iter().map(|e| e.len).sum();
        if total <= self.max_size_bytes {
            return Ok(());
        }
        for entry in eviction_order(entries, keep) {
            if total <= self.max_size_bytes || entry.path == keep {
                break;
            }
            remove_file(&entry.path).await?;
            total = total.saturating_sub(entry.len);
            debug!(path = %entry.path.display(), "evicted cache entry");
        }
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<EntryFile>, CacheError> {
        let io_err = |source| CacheError::Io {
            path: self.directory.clone(),
            source,
        };
        let mut dir = match tokio::fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };
        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(io_err)? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let metadata = match item.metadata().await {
                Ok(metadata) => metadata,
                // Removed by a concurrent clear or eviction.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(e)),
            };
            entries.push(EntryFile {
                path,
                len: metadata.len(),
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            });
        }
        Ok(entries)
    }
}

struct EntryFile {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// Oldest first. `keep` sorts last whatever its mtime, so a coarse clock
/// cannot make the entry just written lose a tie with older ones.
fn eviction_order(mut entries: Vec<EntryFile>, keep: &Path) -> Vec<EntryFile> {
    entries.sort_by(|a, b| {
        (a.path == keep, a.modified, &a.path).cmp(&(b.path == keep, b.modified, &b.path))
    });
    entries
}

async fn discard_temp(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "failed to remove temporary cache file");
        }
    }
}

async fn remove_file(path: &Path) -> Result<(), CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
