// RemoteFetcher: plain HTTP GET retrieval of the version manifest and the
// launcher artifact, with "unreachable" kept distinct from "empty body".

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use lrctl_common::constants;
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::tracing::Tracing;
use lrctl_common::LaunchError;
use lrctl_sdk::TraceWriter;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-2xx status.
    #[error("{url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// The body arrived but could not be written locally.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn unreachable(url: &str, reason: impl ToString) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<FetchError> for LaunchError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unreachable { url, reason } => LaunchError::Unreachable { url, reason },
            FetchError::Write { path, source } => LaunchError::Platform {
                operation: format!("writing {}", path.display()),
                reason: source.to_string(),
            },
        }
    }
}

/// Network retrieval from the trusted origin.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the body as text.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// GET `url` and stream the body into `destination`. On failure the
    /// destination may hold partial content; the caller removes it.
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<(), FetchError>;

    /// Whether `url` answers at all (diagnostics only).
    async fn check_reachable(&self, url: &str) -> bool;
}

/// Whether a manifest location names a remote URL rather than a local path.
pub fn is_remote_location(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `Fetcher` over a proxy-aware `reqwest` client.
pub struct RemoteFetcher {
    client: Client,
    probe_client: Client,
    trace: Tracing,
}

impl RemoteFetcher {
    pub fn new(context: &Arc<LauncherContext>) -> Result<Self> {
        Ok(Self {
            client: context.http_client()?,
            probe_client: context.http_client_with_timeout(constants::PROBE_TIMEOUT)?,
            trace: context.get_trace("RemoteFetcher"),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.trace.verbose(&format!("GET {}", url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::unreachable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::unreachable(url, format!("HTTP {}", status.as_u16())));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for RemoteFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::unreachable(url, format!("body read failed: {}", e)))
    }

    async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let response = self.get(url).await?;

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| FetchError::write(destination, e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| FetchError::unreachable(url, format!("body read failed: {}", e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::write(destination, e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| FetchError::write(destination, e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::write(destination, e))?;

        self.trace.verbose(&format!(
            "Downloaded {} bytes from {} to {}",
            written,
            url,
            destination.display()
        ));
        Ok(())
    }

    async fn check_reachable(&self, url: &str) -> bool {
        match self.probe_client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                self.trace
                    .verbose(&format!("Probe {} answered {}", url, status.as_u16()));
                !status.is_server_error()
            }
            Err(e) => {
                self.trace.verbose(&format!("Probe {} failed: {}", url, e));
                false
            }
        }
    }
}
