//! HTTP surface of the order service.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use domain_orders::{Order, OrderProducer};
use event_channel::render_metrics;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub producer: OrderProducer,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/placeOrder", post(place_order))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn index() -> &'static str {
    "Order Service"
}

/// Plain-text responses: the parse error on 400, the publish error on 500.
async fn place_order(State(state): State<AppState>, body: Bytes) -> Response {
    let order = match Order::from_payload(&body) {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "Rejected malformed order");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match state.producer.place(&order).await {
        Ok(ack) => {
            info!(order_id = order.id, offset = %ack.offset, "Order placed");
            (StatusCode::OK, "Order placed successfully").into_response()
        }
        Err(e) => {
            error!(order_id = order.id, error = %e, "Failed to place order");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn metrics() -> String {
    render_metrics()
}
