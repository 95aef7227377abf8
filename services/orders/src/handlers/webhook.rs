use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::domain::types::{PaymentEvent, ProcessOutcome};
use crate::error::OrdersServiceError;
use crate::state::AppState;
use crate::usecase::process_event::ProcessEventUseCase;

// ── POST /webhooks/payment ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

/// Entry point for verified payment-provider events. Always answers 200 for
/// an event that needs no further delivery (processed, duplicate or
/// ignored); error statuses signal the provider what to do next, 5xx retry,
/// 4xx stop.
pub async fn process_payment_event(
    State(state): State<AppState>,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<WebhookAck>, OrdersServiceError> {
    let usecase = ProcessEventUseCase {
        guard: state.idempotency_guard(),
        store: state.order_store(),
        notifier: state.notification_dispatcher(),
    };

    let outcome = usecase.execute(event).await?;

    Ok(Json(WebhookAck {
        status: ack_status(outcome),
    }))
}

fn ack_status(outcome: ProcessOutcome) -> &'static str {
    match outcome {
        ProcessOutcome::Fulfilled => "fulfilled",
        ProcessOutcome::AlreadyProcessed => "already_processed",
        ProcessOutcome::Ignored => "ignored",
    }
}
