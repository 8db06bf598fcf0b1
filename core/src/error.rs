//! Error types for the destinations fetch pipeline.
//!
//! # Design
//! Every failure of the fetch pipeline lands in one of three variants so
//! callers and tests can tell "no network" from "server said no" from "server
//! sent garbage". Presentation code that only needs a yes/no answer goes
//! through `DestinationRepository::get_destinations`, which collapses all of
//! them into `None`.

use std::path::PathBuf;

use thiserror::Error;

/// Why a destinations fetch produced no collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response: DNS, connect, timeout, or a
    /// broken body stream.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body was empty, `null`, or not a JSON array of destinations.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures of the on-disk response cache. These never fail a fetch; the
/// transport logs them and carries on without the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse transport config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("base_url must be an absolute http(s) URL, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
