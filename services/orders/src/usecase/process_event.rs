use uuid::Uuid;

use crate::domain::repository::{FulfillmentNotifier, IdempotencyGuard, OrderStore};
use crate::domain::types::{
    FulfilledOrder, FulfillmentIntent, PaymentEvent, ProcessOutcome, RefundedOrder,
};
use crate::error::OrdersServiceError;
use crate::usecase::classify::classify;
use crate::usecase::fulfill::{FulfillOrderUseCase, FulfillOutcome};
use crate::usecase::payment_failure::{FailPaymentOutcome, FailPaymentUseCase};
use crate::usecase::refund::{RefundOrderUseCase, RefundOutcome};

enum Action {
    Fulfill,
    Refund,
    FailPayment,
}

enum Dispatched {
    Fulfilled(FulfilledOrder),
    Refunded(RefundedOrder),
    MarkedFailed,
    /// The transition had already happened; nothing was written.
    NoOp,
}

/// The webhook pipeline: classify, admit through the idempotency guard, run
/// the matching orchestrator, then settle the marker and fire notifications
/// once the transaction is durable.
///
/// The guard fails open. If the marker store is unreachable the event is
/// processed anyway and the status-guarded transition in the order store
/// catches the duplicate; an unreachable guard must never stall fulfillment.
pub struct ProcessEventUseCase<G, S, N>
where
    G: IdempotencyGuard,
    S: OrderStore + Clone,
    N: FulfillmentNotifier,
{
    pub guard: G,
    pub store: S,
    pub notifier: N,
}

impl<G, S, N> ProcessEventUseCase<G, S, N>
where
    G: IdempotencyGuard,
    S: OrderStore + Clone,
    N: FulfillmentNotifier,
{
    pub async fn execute(&self, event: PaymentEvent) -> Result<ProcessOutcome, OrdersServiceError> {
        // 1. Classify first: ignored events are acknowledged without ever
        //    touching the guard, so they cannot shadow a later real event.
        let (action, order_id) = match classify(&event) {
            FulfillmentIntent::Ignored => {
                tracing::info!(event_id = %event.event_id, "event ignored");
                return Ok(ProcessOutcome::Ignored);
            }
            FulfillmentIntent::CheckoutCompleted { order_id } => {
                (Action::Fulfill, parse_order_id(&event, &order_id)?)
            }
            FulfillmentIntent::Refunded { order_id } => {
                (Action::Refund, parse_order_id(&event, &order_id)?)
            }
            FulfillmentIntent::PaymentFailed { order_id } => {
                (Action::FailPayment, parse_order_id(&event, &order_id)?)
            }
        };

        // 2. Admission: one atomic reserve decides first delivery vs duplicate
        if !self.admitted(&event.event_id).await {
            tracing::info!(
                event_id = %event.event_id,
                order_id = %order_id,
                "duplicate delivery, already processed"
            );
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        // 3. Run the orchestrator, then settle the reservation: confirmed for
        //    full retention on success, released on failure so the provider's
        //    retry is admitted again.
        match self.dispatch(action, order_id).await {
            Ok(Dispatched::Fulfilled(fulfilled)) => {
                self.confirm_processed(&event.event_id).await;
                self.notifier.order_fulfilled(&fulfilled).await;
                Ok(ProcessOutcome::Fulfilled)
            }
            Ok(Dispatched::Refunded(refunded)) => {
                self.confirm_processed(&event.event_id).await;
                self.notifier.order_refunded(&refunded).await;
                Ok(ProcessOutcome::Fulfilled)
            }
            Ok(Dispatched::MarkedFailed) => {
                self.confirm_processed(&event.event_id).await;
                Ok(ProcessOutcome::Fulfilled)
            }
            Ok(Dispatched::NoOp) => {
                self.confirm_processed(&event.event_id).await;
                Ok(ProcessOutcome::AlreadyProcessed)
            }
            Err(err) => {
                if let OrdersServiceError::InvalidTransition { from, to } = &err {
                    tracing::warn!(
                        event_id = %event.event_id,
                        order_id = %order_id,
                        %from,
                        %to,
                        "invalid order state transition"
                    );
                }
                self.release_reservation(&event.event_id).await;
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        action: Action,
        order_id: Uuid,
    ) -> Result<Dispatched, OrdersServiceError> {
        match action {
            Action::Fulfill => {
                let usecase = FulfillOrderUseCase {
                    store: self.store.clone(),
                };
                match usecase.execute(order_id).await? {
                    FulfillOutcome::Fulfilled(fulfilled) => Ok(Dispatched::Fulfilled(fulfilled)),
                    FulfillOutcome::AlreadyCompleted => Ok(Dispatched::NoOp),
                }
            }
            Action::Refund => {
                let usecase = RefundOrderUseCase {
                    store: self.store.clone(),
                };
                match usecase.execute(order_id).await? {
                    RefundOutcome::Refunded(refunded) => Ok(Dispatched::Refunded(refunded)),
                    RefundOutcome::AlreadyRefunded => Ok(Dispatched::NoOp),
                }
            }
            Action::FailPayment => {
                let usecase = FailPaymentUseCase {
                    store: self.store.clone(),
                };
                match usecase.execute(order_id).await? {
                    FailPaymentOutcome::Failed => Ok(Dispatched::MarkedFailed),
                    FailPaymentOutcome::AlreadyFailed => Ok(Dispatched::NoOp),
                }
            }
        }
    }

    /// Fail-open admission. A guard outage degrades to at-least-once
    /// delivery; the order store still dedupes.
    async fn admitted(&self, event_id: &str) -> bool {
        match self.guard.try_reserve(event_id).await {
            Ok(first_claim) => first_claim,
            Err(err) => {
                tracing::error!(
                    event_id = %event_id,
                    error = %err,
                    "idempotency store unreachable, failing open"
                );
                true
            }
        }
    }

    async fn confirm_processed(&self, event_id: &str) {
        if let Err(err) = self.guard.confirm(event_id).await {
            tracing::warn!(
                event_id = %event_id,
                error = %err,
                "failed to confirm processed-event marker"
            );
        }
    }

    async fn release_reservation(&self, event_id: &str) {
        if let Err(err) = self.guard.release(event_id).await {
            tracing::warn!(
                event_id = %event_id,
                error = %err,
                "failed to release event reservation, retry is blocked until it expires"
            );
        }
    }
}

fn parse_order_id(event: &PaymentEvent, id: &str) -> Result<Uuid, OrdersServiceError> {
    id.parse().map_err(|_| {
        tracing::warn!(
            event_id = %event.event_id,
            order_id = %id,
            raw = %event.raw,
            "event references a malformed order id"
        );
        OrdersServiceError::OrderNotFound
    })
}
