use crate::constants::oven_registry_big_map;
use crate::error::Result;
use crate::models::{BigMapKey, Network};
use crate::services::ExplorerClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Enumeration of the ovens that already exist on a network, used once per
/// supervisor bootstrap
#[async_trait]
pub trait OvenSource: Send + Sync {
    async fn all_ovens(&self, network: Network) -> Result<Vec<String>>;
}

/// Thin client over the oven-registry big map. Goes through the shared
/// explorer client so its requests count against the same rate ceiling.
#[derive(Debug)]
pub struct OvenRegistryClient {
    explorer: Arc<ExplorerClient>,
}

impl OvenRegistryClient {
    pub fn new(explorer: Arc<ExplorerClient>) -> Self {
        Self { explorer }
    }
}

#[async_trait]
impl OvenSource for OvenRegistryClient {
    async fn all_ovens(&self, network: Network) -> Result<Vec<String>> {
        let url = format!(
            "{}/bigmap/{}/{}/keys",
            self.explorer.base_url(),
            network,
            oven_registry_big_map(network)
        );
        let keys: Vec<BigMapKey> = self.explorer.get_json(&url).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.data.key.value)
            .collect())
    }
}
