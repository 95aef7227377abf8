use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrdersServiceError;
use crate::state::AppState;
use crate::usecase::stuck_orders::ListStuckOrdersUseCase;

// ── GET /orders/stuck ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StuckOrdersQuery {
    /// Minimum age in minutes before a pending order counts as stuck.
    pub minutes: Option<i64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StuckOrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub status: &'static str,
    #[serde(serialize_with = "campus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

pub async fn get_stuck_orders(
    State(state): State<AppState>,
    Query(query): Query<StuckOrdersQuery>,
) -> Result<Json<Vec<StuckOrderResponse>>, OrdersServiceError> {
    let usecase = ListStuckOrdersUseCase {
        store: state.order_store(),
    };

    let orders = usecase.execute(query.minutes, query.limit).await?;

    let response = orders
        .into_iter()
        .map(|order| StuckOrderResponse {
            id: order.id,
            user_id: order.user_id,
            total_cents: order.total_cents,
            status: order.status.as_str(),
            created_at: order.created_at,
        })
        .collect();

    Ok(Json(response))
}
