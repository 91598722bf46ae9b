//! Edge probe client

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::errors::RunnerError;

/// Status and headers of one probe of a deployed URL
#[derive(Debug, Clone)]
pub struct EdgeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Unauthenticated client for probing deployed sites
#[derive(Debug, Clone)]
pub struct EdgeProbe {
    client: Client,
}

impl EdgeProbe {
    pub fn new(timeout: Duration) -> Result<Self, RunnerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `url`. Any status is a successful probe; only request errors fail.
    pub async fn probe(&self, url: &Url) -> Result<EdgeResponse, RunnerError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RunnerError::request_failed(format!("Failed to probe {}", url), e))?;

        Ok(EdgeResponse {
            status: response.status(),
            headers: response.headers().clone(),
        })
    }
}
