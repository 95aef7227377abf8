use axum::http::StatusCode;

/// Handler for `GET /healthz` — liveness only. Readiness is wired per
/// service, since it depends on the service's backing stores.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
