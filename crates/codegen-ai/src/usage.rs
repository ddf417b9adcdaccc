//! Server-side usage quota lookup

use std::time::Duration;

use serde::Deserialize;

use crate::{
    error::Result,
    providers::{build_http_client, check_url, read_body},
};

/// Generations used against the account limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UsageQuota {
    pub count: u32,
    pub limit: u32,
}

impl UsageQuota {
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.limit
    }
}

impl std::fmt::Display for UsageQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} free generations", self.count, self.limit)
    }
}

/// Fetches [`UsageQuota`] from a JSON endpoint
#[derive(Clone)]
pub struct UsageClient {
    client: reqwest::Client,
    url: String,
}

impl UsageClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        check_url(&url)?;
        Ok(Self {
            client: build_http_client(Duration::from_secs(10))?,
            url,
        })
    }

    pub async fn fetch(&self) -> Result<UsageQuota> {
        let response = self.client.get(&self.url).send().await?;
        let body = read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
