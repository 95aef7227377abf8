use chrono::{Duration, Utc};

use crate::domain::repository::OrderStore;
use crate::domain::types::Order;
use crate::error::OrdersServiceError;

const DEFAULT_AGE_MINUTES: i64 = 30;
// 366 days. Also keeps the cutoff subtraction inside chrono's range.
const MAX_AGE_MINUTES: i64 = 527_040;
const DEFAULT_LIMIT: u64 = 25;
const MAX_LIMIT: u64 = 100;

/// Operator view: orders that have sat in pending longer than expected,
/// usually because a checkout.completed event never arrived or kept failing.
pub struct ListStuckOrdersUseCase<S: OrderStore> {
    pub store: S,
}

impl<S: OrderStore> ListStuckOrdersUseCase<S> {
    pub async fn execute(
        &self,
        older_than_minutes: Option<i64>,
        limit: Option<u64>,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        let minutes = older_than_minutes
            .unwrap_or(DEFAULT_AGE_MINUTES)
            .clamp(1, MAX_AGE_MINUTES);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let cutoff = Utc::now() - Duration::minutes(minutes);

        self.store.list_stuck_pending(cutoff, limit).await
    }
}
