use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use campus_core::health::healthz;
use campus_core::middleware::request_id_layer;

use crate::handlers::health::readyz;
use crate::handlers::orders::get_stuck_orders;
use crate::handlers::webhook::process_payment_event;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Provider webhooks
        .route("/webhooks/payment", post(process_payment_event))
        // Operator
        .route("/orders/stuck", get(get_stuck_orders))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
