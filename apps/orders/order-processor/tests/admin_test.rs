use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use core_config::AppInfo;
use domain_orders::{
    ConsumerGroupManager, LoggingOrderProcessor, ManagerConfig, ManagerState, Order,
};
use event_channel::{InMemoryBroker, Publisher};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tower::ServiceExt;

fn app_info() -> AppInfo {
    AppInfo {
        name: "order_processor".into(),
        version: "0.1.0".into(),
    }
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_ready_reflects_manager_state() {
    let (state_tx, state_rx) = watch::channel(ManagerState::Closed);
    let router = order_processor::admin_router(app_info(), state_rx);

    let (status, body) = get(router.clone(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Closed");

    state_tx.send_replace(ManagerState::Running);
    let (status, _) = get(router.clone(), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    state_tx.send_replace(ManagerState::Recovering);
    let (status, body) = get(router, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Recovering");
}

#[tokio::test]
async fn test_health_route() {
    let (_state_tx, state_rx) = watch::channel(ManagerState::Running);
    let (status, body) = get(order_processor::admin_router(app_info(), state_rx), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));
}

#[tokio::test(start_paused = true)]
async fn test_manager_state_drives_readiness() {
    let broker = InMemoryBroker::new();
    broker
        .publish("orders", None, &Order::processed(1).to_payload().unwrap())
        .await
        .unwrap();

    let manager = ConsumerGroupManager::new(
        broker.clone(),
        LoggingOrderProcessor,
        ManagerConfig::default(),
    );
    let router = order_processor::admin_router(app_info(), manager.state());
    let mut state = manager.state();

    let (interrupt_tx, interrupt_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        manager
            .run_until(async {
                let _ = interrupt_rx.await;
            })
            .await
    });

    state.wait_for(|s| *s == ManagerState::Running).await.unwrap();
    let (status, _) = get(router.clone(), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(broker.committed("orders", "order-processors").len(), 1);

    interrupt_tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    let (status, body) = get(router, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Closed");
}
