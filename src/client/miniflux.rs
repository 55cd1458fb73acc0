// src/client/miniflux.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::MinifluxConfig;

/// One feed item as the aggregator returns it. Never mutated locally; the
/// rewrite goes back through `update_entry` under the original id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    /// HTML content as stored by the aggregator.
    pub content: String,
    pub feed: Feed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub feed_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntriesPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Thin client for the Miniflux REST API (`X-Auth-Token` auth).
pub struct MinifluxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MinifluxClient {
    pub fn new(config: &MinifluxConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building miniflux http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn get_entries(&self, status: &str, limit: usize) -> Result<EntriesPage> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/v1/entries", self.base_url))
            .query(&[("status", status), ("limit", limit.as_str())])
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .context("fetching entries from miniflux")?;

        let status_code = resp.status();
        if !status_code.is_success() {
            return Err(anyhow!("miniflux entries request failed: {status_code}"));
        }
        resp.json().await.context("decoding miniflux entries page")
    }

    pub async fn update_entry(&self, id: i64, title: &str, content: &str) -> Result<()> {
        #[derive(Serialize)]
        struct Update<'a> {
            title: &'a str,
            content: &'a str,
        }

        let resp = self
            .http
            .put(format!("{}/v1/entries/{id}", self.base_url))
            .header("X-Auth-Token", &self.api_key)
            .json(&Update { title, content })
            .send()
            .await
            .with_context(|| format!("updating miniflux entry {id}"))?;

        let status_code = resp.status();
        if !status_code.is_success() {
            return Err(anyhow!("miniflux entry update failed: {status_code}"));
        }
        Ok(())
    }
}
