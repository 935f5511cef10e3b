use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::AppConfig;

/// Fetches listing pages with a bounded timeout and a browser-like identity.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.fetch_timeout(), &config.user_agent)
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed for {url}"))?;
        let response = response
            .error_for_status()
            .with_context(|| format!("non-success status for {url}"))?;
        response
            .text()
            .await
            .with_context(|| format!("unable to read response body for {url}"))
    }
}
