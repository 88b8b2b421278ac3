//! Coordinator hosting BuyNow processes.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use domain::{
    Aggregate, SkuPurchaseOrderedData, User, UserCommand, UserError, UserEvent, UserService,
};
use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::Result;
use crate::factory::BuyNowProcessManagerFactory;
use crate::process::{BuyNow, BuyNowState};
use crate::repository::ProcessStateRepository;
use crate::services::price::PriceCalculator;
use crate::state::BuyNowStatus;

const TRIGGER_EVENT_TYPE: &str = "SkuPurchaseOrdered";

/// Routes purchases to BuyNow processes and carries out what they decide.
///
/// For every `SkuPurchaseOrdered` the coordinator creates or restores the
/// process keyed by its correlation id, persists its state around each
/// transition, dispatches issued commands through the [`UserService`], and
/// archives the process once it is terminal. Work for one correlation id is
/// serialized; different processes run concurrently.
pub struct BuyNowCoordinator<S, P, R>
where
    S: EventStore,
    P: PriceCalculator,
    R: ProcessStateRepository,
{
    store: S,
    users: Arc<UserService<S>>,
    factory: BuyNowProcessManagerFactory<P>,
    repository: Arc<R>,
    locks: Arc<Mutex<HashMap<AggregateId, Arc<Mutex<()>>>>>,
}

impl<S, P, R> Clone for BuyNowCoordinator<S, P, R>
where
    S: EventStore + Clone,
    P: PriceCalculator,
    R: ProcessStateRepository,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            users: self.users.clone(),
            factory: self.factory.clone(),
            repository: self.repository.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S, P, R> BuyNowCoordinator<S, P, R>
where
    S: EventStore + Clone + 'static,
    P: PriceCalculator + 'static,
    R: ProcessStateRepository + 'static,
{
    /// Creates a new coordinator.
    pub fn new(
        store: S,
        users: Arc<UserService<S>>,
        factory: BuyNowProcessManagerFactory<P>,
        repository: Arc<R>,
    ) -> Self {
        Self {
            store,
            users,
            factory,
            repository,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the process state repository.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Handles a published envelope. Envelopes other than purchases are
    /// ignored and yield None.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id, event_type = %envelope.event_type)
    )]
    pub async fn handle_event(&self, envelope: &EventEnvelope) -> Result<Option<BuyNowState>> {
        if !is_trigger(envelope) {
            return Ok(None);
        }

        match envelope.decode::<UserEvent>()? {
            UserEvent::SkuPurchaseOrdered(data) => self.handle_purchase(&data, None).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Drives the process for a purchase until it is terminal.
    ///
    /// `process_id` overrides the default correlation id (the order id).
    /// Redelivery to a finished process returns its archived state. A failed
    /// follow-up command faults and archives the process before the error
    /// is returned.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn handle_purchase(
        &self,
        event: &SkuPurchaseOrderedData,
        process_id: Option<AggregateId>,
    ) -> Result<BuyNowState> {
        let process_id = process_id.unwrap_or_else(|| event.order_id.into());
        let lock = self.lock_for(process_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.drive(event, process_id).await
        };
        self.release_lock(process_id, lock).await;
        result
    }

    /// Replays every stored purchase through the process path.
    ///
    /// Finished processes are skipped and interrupted ones resume. Returns
    /// the number of purchases seen.
    #[tracing::instrument(skip(self))]
    pub async fn catch_up(&self) -> Result<usize> {
        let mut events = self.store.stream_all_events().await?;
        let mut handled = 0;

        while let Some(envelope) = events.next().await {
            let envelope = envelope?;
            match self.handle_event(&envelope).await {
                Ok(Some(_)) => handled += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, event_id = %envelope.event_id, "Catch-up failed for purchase");
                }
            }
        }

        tracing::info!(handled, "Catch-up finished");
        Ok(handled)
    }

    /// Returns the state of a process, active or archived.
    pub async fn get_process(&self, process_id: AggregateId) -> Result<Option<BuyNowState>> {
        if let Some(state) = self.repository.load(process_id).await? {
            return Ok(Some(state));
        }
        self.repository.find_archived(process_id).await
    }

    /// Subscribes to the store and runs the coordinator on a background task.
    ///
    /// The subscription is taken before this returns, so no event appended
    /// afterwards is missed.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let receiver = self.store.subscribe();
        tokio::spawn(self.run(receiver, shutdown))
    }

    /// Consumes published envelopes until shutdown is signalled or the feed
    /// closes, then waits for in-flight processes.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<EventEnvelope>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut tasks = JoinSet::new();
        tracing::info!("Buy-now coordinator started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Process task failed");
                    }
                }
                received = receiver.recv() => match received {
                    Ok(envelope) => {
                        if is_trigger(&envelope) {
                            let coordinator = self.clone();
                            tasks.spawn(async move {
                                if let Err(e) = coordinator.handle_event(&envelope).await {
                                    tracing::error!(
                                        error = %e,
                                        event_id = %envelope.event_id,
                                        "Failed to handle purchase"
                                    );
                                }
                            });
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Coordinator lagged behind the event feed, catching up");
                        let coordinator = self.clone();
                        tasks.spawn(async move {
                            if let Err(e) = coordinator.catch_up().await {
                                tracing::error!(error = %e, "Catch-up failed");
                            }
                        });
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Process task failed");
            }
        }
        tracing::info!("Buy-now coordinator stopped");
    }

    async fn drive(
        &self,
        event: &SkuPurchaseOrderedData,
        process_id: AggregateId,
    ) -> Result<BuyNowState> {
        if let Some(finished) = self.repository.find_archived(process_id).await? {
            tracing::debug!(%process_id, status = %finished.status, "Process already finished");
            return Ok(finished);
        }

        let mut process = match self.repository.load(process_id).await? {
            Some(state) => {
                tracing::info!(%process_id, status = %state.status, "Resuming buy-now process");
                self.factory.restore(state)
            }
            None => {
                metrics::counter!("buy_now_sagas_started_total").increment(1);
                tracing::info!(%process_id, "Starting buy-now process");
                self.factory.start(event, Some(process_id))
            }
        };

        if !process.begin(event)? {
            self.finish(process.state()).await?;
            return Ok(process.into_state());
        }

        self.repository.save(process.state()).await?;

        while !process.state().is_terminal() {
            if let Err(e) = self.step(&mut process).await {
                process.fault(e.to_string());
                self.repository.save(process.state()).await?;
                self.finish(process.state()).await?;
                return Err(e);
            }
        }

        self.finish(process.state()).await?;
        Ok(process.into_state())
    }

    async fn step(&self, process: &mut BuyNow<P>) -> Result<()> {
        if let Some(command) = process.advance().await {
            // Dispatch before saving: a crash in between redelivers the
            // command, which the user aggregate rejects as settled.
            if self.dispatch(command).await? == Dispatch::AlreadySettled {
                let settled = self.settled_outcome(process.state()).await?;
                process.settled_externally(settled);
            }
        }
        self.repository.save(process.state()).await
    }

    async fn dispatch(&self, command: UserCommand) -> Result<Dispatch> {
        match self.users.submit(command).await {
            Ok(_) => Ok(Dispatch::Applied),
            Err(e) if matches!(e.as_user_error(), Some(UserError::OrderNotFound { .. })) => {
                tracing::warn!(error = %e, "Order already settled, skipping follow-up command");
                Ok(Dispatch::AlreadySettled)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads how the user aggregate settled the process's order.
    async fn settled_outcome(&self, state: &BuyNowState) -> Result<Option<BuyNowStatus>> {
        let events = self
            .store
            .get_events_for_aggregate(state.user_id.into())
            .await?;

        let mut settled = None;
        for envelope in &events {
            match envelope.decode::<UserEvent>()? {
                UserEvent::PendingOrderCompleted(data) if data.order_id == state.order_id => {
                    settled = Some(BuyNowStatus::Completed);
                }
                UserEvent::PendingOrderCanceled(data) if data.order_id == state.order_id => {
                    settled = Some(BuyNowStatus::Canceled);
                }
                _ => {}
            }
        }
        Ok(settled)
    }

    async fn finish(&self, state: &BuyNowState) -> Result<()> {
        self.repository.archive(state.process_id).await?;

        let duration = (state.updated_at - state.started_at)
            .to_std()
            .unwrap_or_default();
        metrics::histogram!("buy_now_saga_duration_seconds").record(duration.as_secs_f64());
        metrics::counter!("buy_now_sagas_finished_total", "status" => state.status.as_str())
            .increment(1);
        tracing::info!(
            process_id = %state.process_id,
            status = %state.status,
            "Buy-now process finished"
        );
        Ok(())
    }

    async fn lock_for(&self, process_id: AggregateId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(process_id).or_default().clone()
    }

    /// Drops the correlation lock entry once nobody else holds or awaits it.
    async fn release_lock(&self, process_id: AggregateId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(&process_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&process_id);
        }
    }
}

/// What happened to a follow-up command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Applied,
    /// The order was no longer pending.
    AlreadySettled,
}

fn is_trigger(envelope: &EventEnvelope) -> bool {
    envelope.aggregate_type == User::aggregate_type() && envelope.event_type == TRIGGER_EVENT_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProcessConfig;
    use crate::repository::InMemoryProcessStateRepository;
    use crate::services::price::InMemoryPriceCalculator;
    use common::{AccountId, Money, SkuId, StockId, UserId};
    use domain::{BuySkuNow, CreateUser};
    use event_store::InMemoryEventStore;

    type TestCoordinator =
        BuyNowCoordinator<InMemoryEventStore, InMemoryPriceCalculator, InMemoryProcessStateRepository>;

    fn coordinator(
        store: &InMemoryEventStore,
        users: Arc<UserService<InMemoryEventStore>>,
        prices: Arc<InMemoryPriceCalculator>,
    ) -> TestCoordinator {
        BuyNowCoordinator::new(
            store.clone(),
            users,
            BuyNowProcessManagerFactory::new(prices, ProcessConfig::default()),
            Arc::new(InMemoryProcessStateRepository::new()),
        )
    }

    #[tokio::test]
    async fn correlation_locks_are_released_once_processes_finish() {
        let store = InMemoryEventStore::new();
        let users = Arc::new(UserService::new(store.clone()));
        let prices = Arc::new(InMemoryPriceCalculator::new());
        let coordinator = coordinator(&store, users.clone(), prices.clone());

        let user_id = UserId::new();
        users
            .create_user(CreateUser::new(user_id, "dave", AccountId::new()))
            .await
            .unwrap();
        let sku_id = SkuId::new();
        prices.register_price(sku_id, Money::from_cents(100)).await;

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let result = users
                .buy_sku_now(BuySkuNow::new(user_id, sku_id, 1, StockId::new()))
                .await
                .unwrap();
            let UserEvent::SkuPurchaseOrdered(purchase) = result.events[0].clone() else {
                panic!("Expected SkuPurchaseOrdered event");
            };
            let coordinator = coordinator.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.handle_purchase(&purchase, None).await
            }));
        }
        for task in tasks {
            let state = task.await.unwrap().unwrap();
            assert_eq!(state.status, BuyNowStatus::Completed);
        }

        assert!(coordinator.locks.lock().await.is_empty());
        assert_eq!(coordinator.repository().active_count().await, 0);
    }

    #[tokio::test]
    async fn failed_process_releases_its_lock() {
        let store = InMemoryEventStore::new();
        let users = Arc::new(UserService::new(store.clone()));
        let prices = Arc::new(InMemoryPriceCalculator::new());
        let coordinator = coordinator(&store, users, prices.clone());

        let purchase = SkuPurchaseOrderedData {
            user_id: UserId::new(),
            sku_id: SkuId::new(),
            quantity: 1,
            order_id: common::OrderId::new(),
            stock_id: StockId::new(),
            account_id: AccountId::new(),
        };
        prices
            .register_price(purchase.sku_id, Money::from_cents(100))
            .await;

        assert!(coordinator.handle_purchase(&purchase, None).await.is_err());
        assert!(coordinator.locks.lock().await.is_empty());
    }
}
