//! Shared JSON-over-HTTP plumbing for the backend clients.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::types::FeedError;

/// Base URL + configured `reqwest` client.
#[derive(Debug, Clone)]
pub struct JsonClient {
    http: Client,
    base_url: String,
}

impl JsonClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build backend HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a path starting with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Api { endpoint: path.to_string(), message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(FeedError::HttpStatus {
                endpoint: path.to_string(),
                status: resp.status().as_u16(),
            }
            .into());
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {path}"))
    }

    /// POST without a body; the response body is ignored.
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| FeedError::Api { endpoint: path.to_string(), message: e.to_string() })?;

        if !resp.status().is_success() {
            return Err(FeedError::HttpStatus {
                endpoint: path.to_string(),
                status: resp.status().as_u16(),
            }
            .into());
        }
        Ok(())
    }
}
