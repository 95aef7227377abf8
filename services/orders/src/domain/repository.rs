#![allow(async_fn_in_trait)]

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{FulfilledOrder, Order, RefundedOrder, Transition};
use crate::error::OrdersServiceError;

/// Port to the transactional order store. The three transition methods run
/// the status-guarded update and every entitlement side effect in one
/// transaction; a `Transition::Stale` result means the guard matched zero
/// rows and nothing was written.
pub trait OrderStore: Send + Sync {
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, OrdersServiceError>;

    /// pending -> completed, plus enrollment grants and booking confirmations.
    async fn complete_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<FulfilledOrder>, OrdersServiceError>;

    /// completed -> refunded, plus enrollment revocation and booking
    /// cancellation.
    async fn refund_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<RefundedOrder>, OrdersServiceError>;

    /// pending -> payment_failed. No entitlement side effects.
    async fn mark_payment_failed(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<()>, OrdersServiceError>;

    /// Orders still pending that were created before `cutoff`, newest first.
    async fn list_stuck_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, OrdersServiceError>;
}

/// Port to the fast processed-event marker store.
///
/// `try_reserve` is the only admission check: it must claim the event id
/// atomically (check and mark in one operation) so concurrent duplicate
/// deliveries resolve to exactly one `true`.
pub trait IdempotencyGuard: Send + Sync {
    /// Claim `event_id` for this delivery. `Ok(true)` means first claim,
    /// `Ok(false)` a duplicate. The claim expires on its own if never settled.
    async fn try_reserve(&self, event_id: &str) -> Result<bool, OrdersServiceError>;

    /// Extend the marker to full retention after the work committed.
    async fn confirm(&self, event_id: &str) -> Result<(), OrdersServiceError>;

    /// Drop the claim after a failure so the provider's retry is admitted.
    async fn release(&self, event_id: &str) -> Result<(), OrdersServiceError>;
}

/// Post-commit notification fan-out. By the time these run the transaction
/// is durable, so implementations log their own failures and never report
/// one to the caller.
pub trait FulfillmentNotifier: Send + Sync {
    async fn order_fulfilled(&self, fulfilled: &FulfilledOrder);
    async fn order_refunded(&self, refunded: &RefundedOrder);
}

/// Customer-facing confirmation sender (message gateway). Runs from spawned
/// tasks, hence the explicit `Send` on the returned futures.
pub trait CustomerNotifier: Send + Sync {
    fn order_confirmation(
        &self,
        fulfilled: &FulfilledOrder,
    ) -> impl Future<Output = Result<(), OrdersServiceError>> + Send;
}

/// Internal staff alerting. Runs from spawned tasks.
pub trait StaffNotifier: Send + Sync {
    fn sale_alert(
        &self,
        fulfilled: &FulfilledOrder,
    ) -> impl Future<Output = Result<(), OrdersServiceError>> + Send;

    fn refund_alert(
        &self,
        refunded: &RefundedOrder,
    ) -> impl Future<Output = Result<(), OrdersServiceError>> + Send;
}

/// Active-cart storage owned by the storefront. Fulfillment only ever clears
/// a cart, and only after the order committed. Runs from spawned tasks.
pub trait CartStore: Send + Sync {
    fn clear_cart(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<(), OrdersServiceError>> + Send;
}
