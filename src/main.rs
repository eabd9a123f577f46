use oven_notifier::services::{ExplorerClient, OvenRegistryClient, WebhookNotifier};
use oven_notifier::supervisor::Supervisor;
use oven_notifier::utils::init_logging;
use oven_notifier::Config;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("🔭 Starting oven notifier...");

    // Refuses to start without both webhook URLs
    let config = Config::from_env()?;

    let explorer = Arc::new(ExplorerClient::new(config.explorer_base_url.clone()));
    let notifier = Arc::new(WebhookNotifier::new(&config));
    let ovens = Arc::new(OvenRegistryClient::new(explorer.clone()));

    let mut supervisors = Vec::new();
    for network_config in config.network_configs() {
        let network = network_config.network;
        let supervisor = Supervisor::new(
            network_config,
            explorer.clone(),
            notifier.clone(),
            ovens.clone(),
        );
        supervisors.push(tokio::spawn(async move {
            if let Err(e) = supervisor.run().await {
                error!(%network, error = %e, "Network supervisor exited");
            }
        }));
    }

    for supervisor in supervisors {
        supervisor.await?;
    }

    Ok(())
}
