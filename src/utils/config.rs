use crate::constants::*;
use crate::models::Network;
use anyhow::Result;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_url_mainnet: String,
    pub webhook_url_testnet: String,
    pub explorer_base_url: String,
    pub poll_interval: Duration,
    pub oven_start_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            webhook_url_mainnet: env::var("WEBHOOK_URL_MAINNET")
                .map_err(|_| anyhow::anyhow!("WEBHOOK_URL_MAINNET must be set"))?,
            webhook_url_testnet: env::var("WEBHOOK_URL_TESTNET")
                .map_err(|_| anyhow::anyhow!("WEBHOOK_URL_TESTNET must be set"))?,
            explorer_base_url: env::var("EXPLORER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_BASE_URL.to_string()),
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            oven_start_delay: Duration::from_millis(
                env::var("OVEN_START_DELAY_MS")
                    .unwrap_or_else(|_| DEFAULT_OVEN_START_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_OVEN_START_DELAY_MS),
            ),
        })
    }

    /// Webhook URL for a network tier
    pub fn webhook_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.webhook_url_mainnet,
            Network::Testnet => &self.webhook_url_testnet,
        }
    }

    /// One supervisor config per watched network
    pub fn network_configs(&self) -> Vec<NetworkConfig> {
        [Network::Mainnet, Network::Testnet]
            .into_iter()
            .map(|network| NetworkConfig {
                network,
                factory_address: factory_address(network).to_string(),
                oven_registry_big_map: oven_registry_big_map(network),
                poll_interval: self.poll_interval,
                oven_start_delay: self.oven_start_delay,
            })
            .collect()
    }
}

/// Everything one network's supervisor needs to bootstrap its watcher tree
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub factory_address: String,
    pub oven_registry_big_map: u64,
    pub poll_interval: Duration,
    pub oven_start_delay: Duration,
}
