use crate::error::{Result, WatcherError};
use crate::models::ContractKind;
use crate::services::OvenSource;
use crate::utils::NetworkConfig;
use crate::watcher::{ContractWatcher, ExplorerApi, NotificationSink, WatcherEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Watcher tasks keyed by contract address. The registry is the only owner
/// of watcher lifecycles; holding the handles here is what makes the
/// at-most-one-watcher-per-contract invariant checkable.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.tasks.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn insert(&mut self, address: String, handle: JoinHandle<()>) -> Result<()> {
        if self.tasks.contains_key(&address) {
            return Err(WatcherError::DuplicateWatcher(address));
        }
        self.tasks.insert(address, handle);
        Ok(())
    }
}

/// Bootstraps and owns one network's watcher tree: the factory watcher,
/// a watcher per pre-existing oven, and fresh watchers for ovens the
/// factory originates while the process runs.
pub struct Supervisor {
    config: NetworkConfig,
    explorer: Arc<dyn ExplorerApi>,
    notifier: Arc<dyn NotificationSink>,
    ovens: Arc<dyn OvenSource>,
    registry: WatcherRegistry,
}

impl Supervisor {
    pub fn new(
        config: NetworkConfig,
        explorer: Arc<dyn ExplorerApi>,
        notifier: Arc<dyn NotificationSink>,
        ovens: Arc<dyn OvenSource>,
    ) -> Self {
        Self {
            config,
            explorer,
            notifier,
            ovens,
            registry: WatcherRegistry::new(),
        }
    }

    pub fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }

    /// Run this network's watcher tree until process termination. Never
    /// returns Ok in normal operation; the event channel stays open for
    /// future originations.
    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.bootstrap(&tx).await?;

        while let Some(event) = rx.recv().await {
            self.handle_event(event, &tx);
        }
        Ok(())
    }

    /// Start the factory watcher, then one oven watcher per existing oven,
    /// pausing between starts so the first-poll storage queries don't hit
    /// the upstream API all at once.
    async fn bootstrap(&mut self, tx: &mpsc::UnboundedSender<WatcherEvent>) -> Result<()> {
        let network = self.config.network;
        info!(%network, factory = %self.config.factory_address, "🚀 Bootstrapping network supervisor");

        let mut factory = ContractWatcher::new(
            network,
            self.config.factory_address.clone(),
            ContractKind::Factory,
            self.explorer.clone(),
            self.notifier.clone(),
        );
        // First cycle runs inline so the factory watermark exists before
        // oven enumeration starts
        factory.run_cycle().await?;
        self.start_watcher(factory, tx.clone())?;

        let ovens = self.ovens.all_ovens(network).await?;
        info!(%network, count = ovens.len(), "Starting watchers for existing ovens");
        for address in ovens {
            tokio::time::sleep(self.config.oven_start_delay).await;
            let watcher = ContractWatcher::new(
                network,
                address,
                ContractKind::Oven,
                self.explorer.clone(),
                self.notifier.clone(),
            );
            if let Err(e) = self.start_watcher(watcher, tx.clone()) {
                warn!(error = %e, "Skipping oven watcher");
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: WatcherEvent, tx: &mpsc::UnboundedSender<WatcherEvent>) {
        match event {
            WatcherEvent::OvenOriginated { network, address } => {
                let watcher = ContractWatcher::new(
                    network,
                    address.clone(),
                    ContractKind::Oven,
                    self.explorer.clone(),
                    self.notifier.clone(),
                );
                match self.start_watcher(watcher, tx.clone()) {
                    Ok(()) => info!(%network, %address, "👀 Watcher started for new oven"),
                    Err(e) => warn!(%address, error = %e, "Not starting watcher for originated oven"),
                }
            }
        }
    }

    /// Register and spawn a self-rescheduling watcher task. The task runs
    /// one cycle per poll interval; transient cycle failures are logged and
    /// retried next interval, a bootstrap failure ends the task.
    fn start_watcher(
        &mut self,
        mut watcher: ContractWatcher,
        tx: mpsc::UnboundedSender<WatcherEvent>,
    ) -> Result<()> {
        let address = watcher.state().address.clone();
        if self.registry.contains(&address) {
            return Err(WatcherError::DuplicateWatcher(address));
        }

        let poll_interval = self.config.poll_interval;
        let task_address = address.clone();
        let handle = tokio::spawn(async move {
            loop {
                if watcher.is_steady() {
                    tokio::time::sleep(poll_interval).await;
                    match watcher.run_cycle().await {
                        Ok(events) => {
                            for event in events {
                                // Send only fails if the supervisor is gone,
                                // which means the process is shutting down
                                let _ = tx.send(event);
                            }
                        }
                        Err(e) => warn!(
                            address = %task_address,
                            error = %e,
                            "Poll cycle failed, retrying next interval"
                        ),
                    }
                } else if let Err(e) = watcher.run_cycle().await {
                    error!(
                        address = %task_address,
                        error = %e,
                        "Watcher bootstrap failed, not rescheduling"
                    );
                    return;
                }
            }
        });
        self.registry.insert(address, handle)
    }
}
