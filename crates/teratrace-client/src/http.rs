//! One-shot delivery over the collector's HTTP ingestion endpoint.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::entry::LogEntry;
use crate::error::{ClientError, Result};

/// Posts each entry to `/ingest`. Failures are returned, never retried.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    url: Url,
}

impl HttpSender {
    /// Creates a sender posting to `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Creates a sender for the ingestion endpoint of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.ingest_url()?, config.request_timeout())
    }

    /// Ingestion endpoint URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Posts one entry.
    ///
    /// The request is spawned before this returns and runs whether or not
    /// the returned future is awaited; the future resolves with its
    /// outcome. Any non-2xx status is an error. Must be called from within
    /// a Tokio runtime.
    pub fn send(&self, entry: &LogEntry) -> BoxFuture<'static, Result<()>> {
        let request = self.client.post(self.url.clone()).json(entry);

        let in_flight = tokio::spawn(post(request));
        async move { in_flight.await.map_err(|_| ClientError::Closed)? }.boxed()
    }
}

async fn post(request: reqwest::RequestBuilder) -> Result<()> {
    let response = request.send().await.map_err(|e| {
        warn!(error = %e, "Collector HTTP send failed");
        ClientError::Transport(e)
    })?;

    let status = response.status();
    response.error_for_status().map_err(|e| {
        warn!(status = %status, "Collector rejected entry");
        ClientError::Transport(e)
    })?;

    debug!(status = %status, "Entry ingested");
    Ok(())
}
