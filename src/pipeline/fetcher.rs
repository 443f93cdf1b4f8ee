//! Source media download
//!
//! The whole body is buffered in memory before it is written to disk. Jobs are
//! expected to reference short clips, so no streaming is done.

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use super::PipelineError;

/// HTTP fetcher for job source links
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl MediaFetcher {
    /// Create a fetcher. `timeout` bounds the whole download when set.
    pub fn new(timeout: Option<Duration>) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(concat!("converter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Download(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Download `link`, requiring a 200 OK response
    pub async fn fetch(&self, link: &Url) -> Result<Bytes, PipelineError> {
        let mut request = self.client.get(link.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PipelineError::DownloadStatus(status.as_u16()));
        }

        response.bytes().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, error: reqwest::Error) -> PipelineError {
        match self.timeout {
            Some(after) if error.is_timeout() => PipelineError::Timeout {
                step: "download",
                after,
            },
            _ => PipelineError::Download(error.to_string()),
        }
    }
}
