//! The destinations repository: one fetch, classified.
//!
//! # Design
//! `fetch_destinations` reports *why* a fetch failed. `get_destinations`
//! keeps the coarse contract presentation code relies on: a collection, or
//! `None` for any failure. Nothing escapes as a panic either way.
//!
//! Concurrent calls are independent round-trips; there is no in-flight
//! de-duplication.

use async_trait::async_trait;
use tracing::{debug, debug_span, warn, Instrument};

use crate::client::DestinationClient;
use crate::config::TransportConfig;
use crate::error::{ConfigError, FetchError};
use crate::transport::{HttpTransport, Transport};
use crate::types::DestinationResponse;

#[async_trait]
pub trait DestinationRepository: Send + Sync {
    async fn fetch_destinations(&self) -> Result<DestinationResponse, FetchError>;

    /// `None` on any failure; the cause is only logged.
    async fn get_destinations(&self) -> Option<DestinationResponse> {
        self.fetch_destinations().await.ok()
    }
}

/// Repository backed by the remote destinations endpoint.
#[derive(Debug)]
pub struct RemoteDestinationRepository<T> {
    client: DestinationClient,
    transport: T,
}

impl<T: Transport> RemoteDestinationRepository<T> {
    pub fn new(client: DestinationClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &DestinationClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl RemoteDestinationRepository<HttpTransport> {
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(DestinationClient::new(&config.base_url), transport))
    }
}

#[async_trait]
impl<T: Transport> DestinationRepository for RemoteDestinationRepository<T> {
    async fn fetch_destinations(&self) -> Result<DestinationResponse, FetchError> {
        let span = debug_span!("fetch_destinations", url = %self.client.base_url());
        async {
            debug!("fetching destinations");
            let request = self.client.build_list_destinations();
            let result = match self.transport.execute(request).await {
                Ok(response) => self.client.parse_list_destinations(response),
                Err(e) => Err(e),
            };
            match &result {
                Ok(destinations) => debug!(count = destinations.len(), "fetched destinations"),
                Err(e) => warn!(error = %e, "destinations fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
