use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use core_config::AppInfo;
use tower::ServiceExt;

fn router() -> axum::Router {
    email_service::admin_router(AppInfo {
        name: "email_service".into(),
        version: "0.1.0".into(),
    })
}

#[tokio::test]
async fn test_health_route() {
    let response = router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["name"], "email_service");
}

#[tokio::test]
async fn test_metrics_route() {
    let response = router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = router()
        .oneshot(Request::builder().uri("/placeOrder").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
