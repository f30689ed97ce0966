use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use core_config::AppInfo;
use domain_orders::{Order, OrderProducer, ProducerConfig};
use event_channel::{InMemoryBroker, RetryConfig};
use std::sync::Arc;
use tower::ServiceExt;

fn app(broker: &InMemoryBroker) -> Router {
    let producer = OrderProducer::new(
        Arc::new(broker.clone()),
        ProducerConfig::default().with_retry(
            RetryConfig::new()
                .with_max_retries(2)
                .with_initial_delay(1)
                .without_jitter(),
        ),
    );
    order_service::app(
        producer,
        AppInfo {
            name: "order_service".into(),
            version: "0.1.0".into(),
        },
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn place(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/placeOrder")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_index() {
    let broker = InMemoryBroker::new();
    let (status, body) = send(
        app(&broker),
        Request::builder().uri("/").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Order Service");
}

#[tokio::test]
async fn test_place_order_publishes_to_orders() {
    let broker = InMemoryBroker::new();
    let (status, body) = send(app(&broker), place(r#"{"id":1,"status":"processed"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Order placed successfully");

    let records = broker.records("orders");
    assert_eq!(records.len(), 1);
    assert!(records[0].key.is_none());
    assert_eq!(
        Order::from_payload(&records[0].payload).unwrap(),
        Order::processed(1)
    );
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let broker = InMemoryBroker::new();
    let (status, body) = send(app(&broker), place(r#"{"id":"one""#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.is_empty());
    assert!(broker.records("orders").is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let broker = InMemoryBroker::new();
    broker.fail_next_publishes(2);

    let (status, _) = send(app(&broker), place(r#"{"id":2,"status":"pending"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(broker.records("orders").len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_is_server_error() {
    let broker = InMemoryBroker::new();
    broker.fail_next_publishes(3);

    let (status, _) = send(app(&broker), place(r#"{"id":3,"status":"processed"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(broker.records("orders").is_empty());
}

#[tokio::test]
async fn test_rejected_publish_is_server_error() {
    let broker = InMemoryBroker::new();
    broker.reject_next_publishes(1);

    let (status, _) = send(app(&broker), place(r#"{"id":4,"status":"processed"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_and_metrics_routes() {
    let broker = InMemoryBroker::new();

    let (status, body) = send(
        app(&broker),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("order_service"));

    let (status, _) = send(
        app(&broker),
        Request::builder().uri("/metrics").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
