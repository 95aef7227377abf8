use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::types::OrderStatus;

#[derive(Debug, thiserror::Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    OrderNotFound,

    #[error("invalid order state transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A dependency (database, idempotency store, gateway) did not answer.
    /// The caller may retry the same request.
    #[error("dependency unavailable")]
    Unavailable(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OrdersServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for OrdersServiceError {
    fn into_response(self) -> Response {
        // Log 5xx only — tower-http TraceLayer already records method/uri/status
        // for all requests. 4xx are expected client errors; logging them here
        // would be noise.
        match &self {
            Self::Unavailable(e) => {
                tracing::error!(error = %e, "dependency unavailable");
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal error");
            }
            _ => {}
        }

        let status = self.status_code();
        let body = Json(json!({
            "kind": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
