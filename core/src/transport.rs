//! Executes `HttpRequest`s over the network.
//!
//! # Design
//! `Transport` is the seam between the pure client and real I/O: the
//! repository only ever sees a `Transport`, so tests substitute a scripted
//! one and hosts with their own HTTP stack can plug theirs in.
//! `HttpTransport` is the production implementation on top of `reqwest`,
//! with the response cache layered in front of the network.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::{CacheLookup, ResponseCache};
use crate::config::TransportConfig;
use crate::error::{ConfigError, FetchError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one round-trip. Any status code is a successful round-trip;
    /// only failures to get a response at all are `Err`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        (**self).execute(request).await
    }
}

#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    cache: Option<ResponseCache>,
    debug_logging: bool,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.write_timeout())
            .build()?;
        Ok(Self {
            client,
            cache: config.cache.as_ref().map(ResponseCache::new),
            debug_logging: config.debug_logging,
        })
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let started = Instant::now();
        if self.debug_logging {
            debug!(
                method = request.method.as_str(),
                url = %request.url,
                headers = ?request.headers,
                "--> request"
            );
        }

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(network_error)?;

        if self.debug_logging {
            debug!(
                status,
                bytes = body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                url = %request.url,
                "<-- response"
            );
        }
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let Some(cache) = &self.cache else {
            return self.send(&request).await;
        };

        let stale = match cache.lookup(&request.url).await {
            Ok(CacheLookup::Fresh(response)) => return Ok(response),
            Ok(CacheLookup::Stale(entry)) => {
                request.headers.extend(entry.validators());
                Some(entry)
            }
            Ok(CacheLookup::Miss) => None,
            Err(e) => {
                warn!(error = %e, "cache lookup failed");
                None
            }
        };

        let response = self.send(&request).await?;

        if response.status == 304 {
            if let Some(entry) = stale {
                return match cache.refresh(entry.clone(), &response).await {
                    Ok(cached) => Ok(cached),
                    Err(e) => {
                        warn!(error = %e, "cache refresh failed");
                        Ok(entry.to_response())
                    }
                };
            }
        }

        if let Err(e) = cache.store(&request.url, &response).await {
            warn!(error = %e, "cache store failed");
        }
        Ok(response)
    }
}

fn network_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network(format!("timed out: {e}"))
    } else {
        FetchError::Network(e.to_string())
    }
}
