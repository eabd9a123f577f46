use crate::constants::{RATE_LIMIT_WINDOW_SECS, WEBHOOK_RATE_LIMIT_PER_MINUTE};
use crate::error::{Result, WatcherError};
use crate::models::Network;
use crate::utils::{Config, RateLimiter};
use crate::watcher::NotificationSink;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    content: &'a str,
}

/// Delivers formatted messages to the per-network chat webhooks. Runs its
/// own rate limiter with a lower ceiling than the explorer client.
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url_mainnet: String,
    webhook_url_testnet: String,
    rate_limiter: RateLimiter,
}

impl WebhookNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            webhook_url_mainnet: config.webhook_url_mainnet.clone(),
            webhook_url_testnet: config.webhook_url_testnet.clone(),
            rate_limiter: RateLimiter::new(
                WEBHOOK_RATE_LIMIT_PER_MINUTE,
                Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            ),
        }
    }

    fn webhook_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.webhook_url_mainnet,
            Network::Testnet => &self.webhook_url_testnet,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, network: Network, content: &str) -> Result<()> {
        self.rate_limiter.acquire().await;
        let url = self.webhook_url(network);

        let response = self
            .client
            .post(url)
            .json(&WebhookBody { content })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WatcherError::Upstream {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        debug!(%network, "Notification delivered");
        Ok(())
    }
}
