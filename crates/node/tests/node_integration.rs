//! Integration tests for the shop node lifecycle.

use std::time::Duration;

use common::{AccountId, AggregateId, Money, SkuId, StockId, UserId};
use domain::{BuySkuNow, CreateUser, UserEvent};
use node::{NodeConfig, NodeError, ShopNode};
use saga::{BuyNowState, BuyNowStatus, PriceCalculator, ProcessStateRepository};

fn units(amount: i64) -> Money {
    Money::from_units(amount).unwrap()
}

async fn create_user(node: &ShopNode) -> UserId {
    let user_id = UserId::new();
    node.user_service()
        .create_user(CreateUser::new(user_id, "carol", AccountId::new()))
        .await
        .unwrap();
    user_id
}

async fn buy(node: &ShopNode, user_id: UserId, sku_id: SkuId) -> AggregateId {
    let result = node
        .user_service()
        .buy_sku_now(BuySkuNow::new(user_id, sku_id, 2, StockId::new()))
        .await
        .unwrap();
    match &result.events[0] {
        UserEvent::SkuPurchaseOrdered(data) => data.order_id.into(),
        other => panic!("Expected SkuPurchaseOrdered, got {other:?}"),
    }
}

async fn wait_for_archived(node: &ShopNode, process_id: AggregateId) -> BuyNowState {
    let repository = node.coordinator().repository();
    for _ in 0..200 {
        if let Some(state) = repository.find_archived(process_id).await.unwrap() {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Process {process_id} was not archived");
}

#[tokio::test]
async fn test_running_node_settles_purchases() {
    let mut node = ShopNode::new(&NodeConfig::default());
    assert_eq!(node.start().await.unwrap(), 0);
    assert!(node.is_running());

    let sku_id = SkuId::new();
    node.price_calculator()
        .register_price(sku_id, units(5))
        .await;
    let user_id = create_user(&node).await;
    let process_id = buy(&node, user_id, sku_id).await;

    let state = wait_for_archived(&node, process_id).await;
    assert_eq!(state.status, BuyNowStatus::Completed);
    assert_eq!(state.price, Some(units(10)));

    node.stop().await.unwrap();
    assert!(!node.is_running());
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let mut node = ShopNode::new(&NodeConfig::default());
    node.start().await.unwrap();

    let result = node.start().await;
    assert!(matches!(result, Err(NodeError::AlreadyRunning)));

    node.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let mut node = ShopNode::new(&NodeConfig::default());
    node.stop().await.unwrap();
    assert!(!node.is_running());
}

#[tokio::test]
async fn test_restart_replays_purchases_made_while_stopped() {
    let mut node = ShopNode::new(&NodeConfig::default());
    node.start().await.unwrap();
    node.stop().await.unwrap();

    let user_id = create_user(&node).await;
    let process_id = buy(&node, user_id, SkuId::new()).await;
    assert!(
        node.coordinator()
            .get_process(process_id)
            .await
            .unwrap()
            .is_none()
    );

    let replayed = node.start().await.unwrap();
    assert_eq!(replayed, 1);

    let state = wait_for_archived(&node, process_id).await;
    assert_eq!(state.status, BuyNowStatus::Canceled);

    let user = node.user_service().get_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.pending_order_count(), 0);

    node.stop().await.unwrap();
}
