use uuid::Uuid;

use crate::domain::repository::OrderStore;
use crate::domain::types::{OrderStatus, Transition};
use crate::error::OrdersServiceError;

#[derive(Debug)]
pub enum FailPaymentOutcome {
    Failed,
    AlreadyFailed,
}

/// Records a declined payment. Marks the order payment_failed so the
/// customer can retry checkout; grants nothing, revokes nothing. An order
/// that already completed is never downgraded.
pub struct FailPaymentUseCase<S: OrderStore> {
    pub store: S,
}

impl<S: OrderStore> FailPaymentUseCase<S> {
    pub async fn execute(&self, order_id: Uuid) -> Result<FailPaymentOutcome, OrdersServiceError> {
        // 1. The order must exist → 404 if not
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrdersServiceError::OrderNotFound)?;

        // 2. Redelivered failure event → success with no writes
        if order.status == OrderStatus::PaymentFailed {
            return Ok(FailPaymentOutcome::AlreadyFailed);
        }

        // 3. Only a pending order can fail; a completed or refunded one
        //    stays where it is → 409
        if order.status != OrderStatus::Pending {
            return Err(OrdersServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::PaymentFailed,
            });
        }

        // 4. Guarded transition, no side effects
        match self.store.mark_payment_failed(order_id).await? {
            Transition::Applied(()) => {
                tracing::info!(order_id = %order_id, "order marked payment_failed");
                Ok(FailPaymentOutcome::Failed)
            }
            Transition::Stale(OrderStatus::PaymentFailed) => Ok(FailPaymentOutcome::AlreadyFailed),
            Transition::Stale(actual) => Err(OrdersServiceError::InvalidTransition {
                from: actual,
                to: OrderStatus::PaymentFailed,
            }),
        }
    }
}
