//! Data layer for the destinations listing.
//!
//! # Overview
//! Fetches the destination list from a single JSON endpoint and hands it to
//! presentation code as a typed collection, plus the small pure helpers that
//! code needs to render it (currency symbols, image requests, search,
//! debouncing).
//!
//! # Design
//! - `DestinationClient` is stateless: it builds the `GET` and parses the
//!   reply as plain data (`HttpRequest` / `HttpResponse`), so hosts that do
//!   their own I/O can use it directly.
//! - `Transport` performs the round-trip; `HttpTransport` does it with
//!   `reqwest` behind a disk `ResponseCache`.
//! - `DestinationRepository` classifies the outcome into a `FetchError`, and
//!   collapses it to `None` for callers that only need a yes/no.
//! - `GetDestinations` moves the fetch onto a dedicated I/O runtime.

pub mod cache;
pub mod client;
pub mod config;
pub mod currency;
pub mod error;
pub mod http;
pub mod image;
pub mod locker;
pub mod repository;
pub mod search;
pub mod transport;
pub mod types;
pub mod usecase;

pub use cache::{CacheEntry, CacheLookup, ResponseCache};
pub use client::DestinationClient;
pub use config::{CacheConfig, TransportConfig};
pub use currency::currency_symbol_for;
pub use error::{CacheError, ConfigError, FetchError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use image::{build_image_request, CachePolicy, ImageContext, ImageRequest, ImageSource};
pub use locker::ExecutionLocker;
pub use repository::{DestinationRepository, RemoteDestinationRepository};
pub use search::filter_destinations;
pub use transport::{HttpTransport, Transport};
pub use types::{DestinationRecord, DestinationResponse};
pub use usecase::{GetDestinations, IoRuntime, UseCase};
