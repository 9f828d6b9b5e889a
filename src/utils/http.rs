// src/utils/http.rs

//! HTTP client utilities.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body as text, treating non-success statuses as fetch failures.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::fetch(url, format!("HTTP {status}")));
    }
    Ok(response.text().await?)
}

/// Fetch a page body as raw bytes (feed documents).
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::fetch(url, format!("HTTP {status}")));
    }
    Ok(response.bytes().await?.to_vec())
}

/// Response bodies fetched at most once per URL.
///
/// The map lock only guards cell lookup; fetches of different URLs run
/// concurrently and concurrent callers for one URL share a single fetch.
/// A failed fetch leaves the cell empty so a later caller retries.
#[derive(Debug, Default)]
pub struct BodyCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<Vec<u8>>>>>>,
}

impl BodyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, url: &str, fetch: F) -> Result<Arc<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(url.to_string()).or_default())
        };
        let body = cell
            .get_or_try_init(|| async { fetch().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(body))
    }
}
