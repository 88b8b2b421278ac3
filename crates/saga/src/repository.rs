//! Persistence of BuyNow process state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};
use crate::process::BuyNowState;

/// Stores active process state and keeps finished processes for lookup.
#[async_trait]
pub trait ProcessStateRepository: Send + Sync {
    /// Loads the state of an active process.
    async fn load(&self, process_id: AggregateId) -> Result<Option<BuyNowState>>;

    /// Inserts or replaces the state of an active process.
    async fn save(&self, state: &BuyNowState) -> Result<()>;

    /// Moves a finished process out of the active set.
    async fn archive(&self, process_id: AggregateId) -> Result<()>;

    /// Loads the state of an archived process.
    async fn find_archived(&self, process_id: AggregateId) -> Result<Option<BuyNowState>>;
}

#[derive(Debug, Default)]
struct Inner {
    active: HashMap<AggregateId, BuyNowState>,
    archived: HashMap<AggregateId, BuyNowState>,
}

/// In-memory process state repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessStateRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryProcessStateRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of active processes.
    pub async fn active_count(&self) -> usize {
        self.inner.read().await.active.len()
    }

    /// Returns the number of archived processes.
    pub async fn archived_count(&self) -> usize {
        self.inner.read().await.archived.len()
    }
}

#[async_trait]
impl ProcessStateRepository for InMemoryProcessStateRepository {
    async fn load(&self, process_id: AggregateId) -> Result<Option<BuyNowState>> {
        Ok(self.inner.read().await.active.get(&process_id).cloned())
    }

    async fn save(&self, state: &BuyNowState) -> Result<()> {
        self.inner
            .write()
            .await
            .active
            .insert(state.process_id, state.clone());
        Ok(())
    }

    async fn archive(&self, process_id: AggregateId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner
            .active
            .remove(&process_id)
            .ok_or(SagaError::ProcessNotFound(process_id))?;
        inner.archived.insert(process_id, state);
        Ok(())
    }

    async fn find_archived(&self, process_id: AggregateId) -> Result<Option<BuyNowState>> {
        Ok(self.inner.read().await.archived.get(&process_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BuyNowStatus;
    use common::{AccountId, OrderId, SkuId, StockId, UserId};
    use domain::SkuPurchaseOrderedData;

    fn state() -> BuyNowState {
        BuyNowState::new(
            &SkuPurchaseOrderedData {
                user_id: UserId::new(),
                sku_id: SkuId::new(),
                quantity: 1,
                order_id: OrderId::new(),
                stock_id: StockId::new(),
                account_id: AccountId::new(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn save_then_load() {
        let repository = InMemoryProcessStateRepository::new();
        let mut state = state();

        repository.save(&state).await.unwrap();
        state.status = BuyNowStatus::PriceResolving;
        repository.save(&state).await.unwrap();

        let loaded = repository.load(state.process_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, BuyNowStatus::PriceResolving);
        assert_eq!(repository.active_count().await, 1);
    }

    #[tokio::test]
    async fn archive_moves_state_out_of_active_set() {
        let repository = InMemoryProcessStateRepository::new();
        let state = state();
        repository.save(&state).await.unwrap();

        repository.archive(state.process_id).await.unwrap();

        assert!(repository.load(state.process_id).await.unwrap().is_none());
        assert_eq!(
            repository.find_archived(state.process_id).await.unwrap(),
            Some(state)
        );
        assert_eq!(repository.archived_count().await, 1);
    }

    #[tokio::test]
    async fn archive_unknown_process_fails() {
        let repository = InMemoryProcessStateRepository::new();
        let process_id = AggregateId::new();

        let result = repository.archive(process_id).await;
        assert!(matches!(result, Err(SagaError::ProcessNotFound(id)) if id == process_id));
    }
}
