use uuid::Uuid;

use crate::domain::repository::OrderStore;
use crate::domain::types::{OrderStatus, RefundedOrder, Transition};
use crate::error::OrdersServiceError;

#[derive(Debug)]
pub enum RefundOutcome {
    /// This call performed the completed -> refunded transition.
    Refunded(RefundedOrder),
    /// The order was already refunded; nothing was written.
    AlreadyRefunded,
}

/// Unwinds a fulfilled order after the provider refunded the charge: flips
/// it to refunded and revokes what fulfillment granted, all inside one store
/// transaction. Only completed orders can be refunded.
pub struct RefundOrderUseCase<S: OrderStore> {
    pub store: S,
}

impl<S: OrderStore> RefundOrderUseCase<S> {
    pub async fn execute(&self, order_id: Uuid) -> Result<RefundOutcome, OrdersServiceError> {
        // 1. The order must exist → 404 if not
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrdersServiceError::OrderNotFound)?;

        // 2. Redelivered refund event → success with no writes
        if order.status == OrderStatus::Refunded {
            return Ok(RefundOutcome::AlreadyRefunded);
        }

        // 3. Refunding an order that never completed is a forbidden edge → 409
        if order.status != OrderStatus::Completed {
            return Err(OrdersServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Refunded,
            });
        }

        // 4. Guarded transition + entitlement revocation in one transaction
        match self.store.refund_order(order_id).await? {
            Transition::Applied(refunded) => {
                tracing::info!(
                    order_id = %order_id,
                    enrollments = refunded.enrollments_revoked,
                    bookings = refunded.bookings_cancelled,
                    "order refunded"
                );
                Ok(RefundOutcome::Refunded(refunded))
            }
            Transition::Stale(OrderStatus::Refunded) => Ok(RefundOutcome::AlreadyRefunded),
            Transition::Stale(actual) => Err(OrdersServiceError::InvalidTransition {
                from: actual,
                to: OrderStatus::Refunded,
            }),
        }
    }
}
