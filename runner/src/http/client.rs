//! HTTP client implementation

use std::time::Duration;

use platform_api::Envelope;
use reqwest::{header, Client, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::RunnerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the platform API, scoped to one account and project
pub struct PlatformClient {
    client: Client,
    base_url: String,
    account_id: String,
    project_name: String,
    token: SecretString,
}

impl PlatformClient {
    /// Create a new platform client
    pub fn new(
        base_url: &str,
        account_id: &str,
        project_name: &str,
        token: SecretString,
    ) -> Result<Self, RunnerError> {
        // Reject malformed base URLs before any request is made
        Url::parse(base_url)?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            project_name: project_name.to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Host part of the base URL
    pub fn api_host(&self) -> Result<String, RunnerError> {
        let url = Url::parse(&self.base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| RunnerError::ConfigError(format!("API URL has no host: {}", self.base_url)))?;
        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Path of the configured project
    pub fn project_path(&self) -> String {
        format!("/accounts/{}/pages/projects/{}", self.account_id, self.project_name)
    }

    /// Send a request and unwrap the `result` of the response envelope.
    ///
    /// `context` prefixes every error raised along the way.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        context: &str,
    ) -> Result<T, RunnerError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RunnerError::request_failed(context, e))?;

        if !response.status().is_success() {
            return Err(response_error(context, response).await);
        }

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RunnerError::request_failed(context, e))?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            error!("{}: unparsable response body: {}", context, e);
            RunnerError::Transport {
                context: format!("{}: unparsable response body ({})", context, e),
                status: Some(status),
                body: text.clone(),
            }
        })?;

        envelope.result.ok_or_else(|| RunnerError::Transport {
            context: format!("{}: response has no result", context),
            status: Some(status),
            body: text,
        })
    }

    /// Send a request whose response body is ignored beyond its status
    pub async fn request_status(&self, method: Method, path: &str, context: &str) -> Result<(), RunnerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| RunnerError::request_failed(context, e))?;

        if !response.status().is_success() {
            return Err(response_error(context, response).await);
        }
        Ok(())
    }
}

/// Turn a non-OK response into a transport error carrying status and raw body
pub async fn response_error(context: &str, response: Response) -> RunnerError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!("{} failed: {} - {}", context, status, body);
    RunnerError::Transport {
        context: context.to_string(),
        status: Some(status.as_u16()),
        body,
    }
}
