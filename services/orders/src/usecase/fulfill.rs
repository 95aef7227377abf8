use uuid::Uuid;

use crate::domain::repository::OrderStore;
use crate::domain::types::{FulfilledOrder, OrderStatus, Transition};
use crate::error::OrdersServiceError;

#[derive(Debug)]
pub enum FulfillOutcome {
    /// This call performed the pending -> completed transition.
    Fulfilled(FulfilledOrder),
    /// The order was already completed; nothing was written.
    AlreadyCompleted,
}

/// Completes a paid order: flips it to completed and grants what was bought,
/// all inside one store transaction.
pub struct FulfillOrderUseCase<S: OrderStore> {
    pub store: S,
}

impl<S: OrderStore> FulfillOrderUseCase<S> {
    pub async fn execute(&self, order_id: Uuid) -> Result<FulfillOutcome, OrdersServiceError> {
        // 1. The order must exist → 404 if not
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrdersServiceError::OrderNotFound)?;

        // 2. Already completed → success with no writes. This holds even when
        //    the fast-path guard let a duplicate through.
        if order.status == OrderStatus::Completed {
            return Ok(FulfillOutcome::AlreadyCompleted);
        }

        // 3. Completing anything but a pending order is a forbidden edge → 409
        if order.status != OrderStatus::Pending {
            return Err(OrdersServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Completed,
            });
        }

        // 4. Guarded transition + entitlement grants in one transaction. A
        //    concurrent winner between steps 1 and 4 makes the guard match
        //    zero rows; the store reports the status it found instead.
        match self.store.complete_order(order_id).await? {
            Transition::Applied(fulfilled) => {
                tracing::info!(
                    order_id = %order_id,
                    enrollments = fulfilled.enrollments_granted,
                    bookings = fulfilled.bookings_confirmed,
                    "order fulfilled"
                );
                Ok(FulfillOutcome::Fulfilled(fulfilled))
            }
            Transition::Stale(OrderStatus::Completed) => Ok(FulfillOutcome::AlreadyCompleted),
            Transition::Stale(actual) => Err(OrdersServiceError::InvalidTransition {
                from: actual,
                to: OrderStatus::Completed,
            }),
        }
    }
}
