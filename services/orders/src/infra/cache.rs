use chrono::Utc;
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};
use uuid::Uuid;

use crate::domain::repository::{CartStore, IdempotencyGuard};
use crate::domain::types::{PENDING_MARKER_TTL_SECS, PROCESSED_MARKER_TTL_SECS};
use crate::error::OrdersServiceError;

fn event_key(event_id: &str) -> String {
    format!("processed_event:{event_id}")
}

fn cart_key(user_id: Uuid) -> String {
    format!("cart:{user_id}")
}

/// Processed-event markers in Redis. The marker value is the timestamp of
/// the claim, useful when digging through a replay incident by hand.
#[derive(Clone)]
pub struct RedisIdempotencyGuard {
    pub pool: Pool,
}

impl IdempotencyGuard for RedisIdempotencyGuard {
    async fn try_reserve(&self, event_id: &str) -> Result<bool, OrdersServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| OrdersServiceError::Unavailable(e.into()))?;

        // SET NX EX is one atomic command, so the check and the mark cannot
        // interleave with a concurrent duplicate.
        let reply: Option<String> = redis::cmd("SET")
            .arg(event_key(event_id))
            .arg(Utc::now().to_rfc3339())
            .arg("NX")
            .arg("EX")
            .arg(PENDING_MARKER_TTL_SECS)
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| OrdersServiceError::Unavailable(e.into()))?;

        Ok(reply.is_some())
    }

    async fn confirm(&self, event_id: &str) -> Result<(), OrdersServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| OrdersServiceError::Unavailable(e.into()))?;

        let (): () = conn
            .set_ex(
                event_key(event_id),
                Utc::now().to_rfc3339(),
                PROCESSED_MARKER_TTL_SECS,
            )
            .await
            .map_err(|e: redis::RedisError| OrdersServiceError::Unavailable(e.into()))?;

        Ok(())
    }

    async fn release(&self, event_id: &str) -> Result<(), OrdersServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| OrdersServiceError::Unavailable(e.into()))?;

        let _: i64 = conn
            .del(event_key(event_id))
            .await
            .map_err(|e: redis::RedisError| OrdersServiceError::Unavailable(e.into()))?;

        Ok(())
    }
}

/// The storefront keeps the active cart in Redis; fulfillment clears it
/// after the purchase committed.
#[derive(Clone)]
pub struct RedisCartStore {
    pub pool: Pool,
}

impl CartStore for RedisCartStore {
    async fn clear_cart(&self, user_id: Uuid) -> Result<(), OrdersServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| OrdersServiceError::Unavailable(e.into()))?;

        let _: i64 = conn
            .del(cart_key(user_id))
            .await
            .map_err(|e: redis::RedisError| OrdersServiceError::Unavailable(e.into()))?;

        Ok(())
    }
}
