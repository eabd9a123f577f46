use crate::constants::*;
use crate::error::{Result, WatcherError};
use crate::models::{Network, Operation, OperationGroupRecord, StorageNode};
use crate::utils::RateLimiter;
use crate::watcher::ExplorerApi;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Rate-limited client for the block-explorer REST API, shared by all
/// watchers as a stateless dispatcher
#[derive(Debug)]
pub struct ExplorerClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl ExplorerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            rate_limiter: RateLimiter::new(
                EXPLORER_RATE_LIMIT_PER_MINUTE,
                Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            ),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document with rate limiting and lightweight retry on
    /// transport errors and 5xx responses
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.rate_limiter.acquire().await;

            let error = match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json::<T>().await?),
                Ok(resp) => WatcherError::Upstream {
                    status: resp.status().as_u16(),
                    url: url.to_string(),
                },
                Err(e) => WatcherError::Network(e),
            };

            if attempt >= UPSTREAM_RETRY_ATTEMPTS || !error.is_retryable() {
                return Err(error);
            }
            warn!(%url, attempt, error = %error, "Explorer request failed, retrying");
            tokio::time::sleep(Duration::from_millis(UPSTREAM_RETRY_DELAY_MS)).await;
        }
    }
}

#[async_trait]
impl ExplorerApi for ExplorerClient {
    async fn operations(
        &self,
        network: Network,
        address: &str,
        since: Option<i64>,
    ) -> Result<Vec<Operation>> {
        let url = operations_url(&self.base_url, network, address, since);
        let mut ops: Vec<Operation> = self.get_json(&url).await?;

        ops.retain(|op| !op.internal);
        if let Some(watermark) = since {
            // The +1s query bound already excludes the boundary second, but
            // the contract is strictly-greater-than the watermark
            ops.retain(|op| op.timestamp > watermark);
        }
        ops.sort_by_key(|op| op.timestamp);
        Ok(ops)
    }

    async fn storage_owner(&self, network: Network, address: &str) -> Result<String> {
        let url = format!("{}/contract/{}/{}/storage", self.base_url, network, address);
        let nodes: Vec<StorageNode> = self.get_json(&url).await?;
        owner_from_storage(&nodes)
            .ok_or_else(|| WatcherError::data_shape(format!("no owner field in storage of {address}")))
    }

    async fn origination_destination(&self, _network: Network, hash: &str) -> Result<String> {
        let url = format!("{}/opg/{}", self.base_url, hash);
        let records: Vec<OperationGroupRecord> = self.get_json(&url).await?;
        origination_in(&records)
            .ok_or_else(|| WatcherError::data_shape(format!("no origination in operation group {hash}")))
    }
}

/// Build the operations query URL. The upstream `from` bound is inclusive,
/// so the watermark is shifted by one second.
fn operations_url(base: &str, network: Network, address: &str, since: Option<i64>) -> String {
    let mut url = format!("{base}/contract/{network}/{address}/operations?status=applied");
    if let Some(watermark) = since {
        url.push_str(&format!("&from={}", watermark + WATERMARK_QUERY_OFFSET_MS));
    }
    url
}

/// Owner extraction reads the first top-level storage node's children and
/// picks the one named `owner`
fn owner_from_storage(nodes: &[StorageNode]) -> Option<String> {
    nodes
        .first()?
        .children
        .iter()
        .find(|child| child.name.as_deref() == Some(STORAGE_OWNER_FIELD))?
        .value
        .clone()
}

fn origination_in(records: &[OperationGroupRecord]) -> Option<String> {
    records
        .iter()
        .find(|record| record.kind == OPERATION_KIND_ORIGINATION)?
        .destination
        .clone()
}
