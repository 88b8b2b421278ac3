//! Shop node: an in-memory host for the user service and the BuyNow
//! coordinator.
//!
//! [`ShopNode::start`] subscribes the coordinator to the event store and
//! replays stored purchases so that work interrupted by a previous stop is
//! finished. [`ShopNode::stop`] signals shutdown and waits for in-flight
//! processes.

pub mod config;
pub mod error;

use std::sync::Arc;

use domain::UserService;
use event_store::InMemoryEventStore;
use saga::{
    BuyNowCoordinator, BuyNowProcessManagerFactory, InMemoryPriceCalculator,
    InMemoryProcessStateRepository, ProcessConfig,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use config::{LogFormat, NodeConfig};
pub use error::NodeError;

/// Coordinator type hosted by the node.
pub type NodeCoordinator =
    BuyNowCoordinator<InMemoryEventStore, InMemoryPriceCalculator, InMemoryProcessStateRepository>;

pub struct ShopNode {
    users: Arc<UserService<InMemoryEventStore>>,
    prices: Arc<InMemoryPriceCalculator>,
    coordinator: NodeCoordinator,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ShopNode {
    /// Wires the store, user service, price table, and coordinator.
    pub fn new(config: &NodeConfig) -> Self {
        let store = InMemoryEventStore::new();
        let users = Arc::new(UserService::new(store.clone()));
        let prices = Arc::new(InMemoryPriceCalculator::new());
        let factory = BuyNowProcessManagerFactory::new(
            prices.clone(),
            ProcessConfig::new(config.price_timeout),
        );
        let coordinator = BuyNowCoordinator::new(
            store,
            users.clone(),
            factory,
            Arc::new(InMemoryProcessStateRepository::new()),
        );
        let (shutdown, _) = watch::channel(false);

        Self {
            users,
            prices,
            coordinator,
            shutdown,
            task: None,
        }
    }

    pub fn user_service(&self) -> &Arc<UserService<InMemoryEventStore>> {
        &self.users
    }

    pub fn price_calculator(&self) -> &Arc<InMemoryPriceCalculator> {
        &self.prices
    }

    pub fn coordinator(&self) -> &NodeCoordinator {
        &self.coordinator
    }

    /// Returns true while the coordinator task is running.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the coordinator and replays stored purchases.
    ///
    /// Returns the number of purchases seen during the replay.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self) -> Result<usize, NodeError> {
        if self.task.is_some() {
            return Err(NodeError::AlreadyRunning);
        }

        self.shutdown.send_replace(false);
        let task = self.coordinator.clone().spawn(self.shutdown.subscribe());
        self.task = Some(task);

        let replayed = self.coordinator.catch_up().await?;
        tracing::info!(replayed, "Shop node started");
        Ok(replayed)
    }

    /// Signals shutdown and waits for the coordinator to drain.
    ///
    /// Stopping a node that is not running does nothing.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        self.shutdown.send_replace(true);
        task.await?;
        tracing::info!("Shop node stopped");
        Ok(())
    }
}
