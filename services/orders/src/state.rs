use deadpool_redis::Pool as RedisPool;
use reqwest::Client;
use sea_orm::DatabaseConnection;

use crate::infra::cache::{RedisCartStore, RedisIdempotencyGuard};
use crate::infra::db::DbOrderStore;
use crate::infra::notify::{NotificationDispatcher, WebhookCustomerNotifier, WebhookStaffNotifier};

/// Shared handles, cloned into every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub http: Client,
    pub notify_webhook_url: Option<String>,
    pub staff_webhook_url: Option<String>,
}

impl AppState {
    pub fn order_store(&self) -> DbOrderStore {
        DbOrderStore {
            db: self.db.clone(),
        }
    }

    pub fn idempotency_guard(&self) -> RedisIdempotencyGuard {
        RedisIdempotencyGuard {
            pool: self.redis.clone(),
        }
    }

    pub fn cart_store(&self) -> RedisCartStore {
        RedisCartStore {
            pool: self.redis.clone(),
        }
    }

    pub fn customer_notifier(&self) -> WebhookCustomerNotifier {
        WebhookCustomerNotifier {
            client: self.http.clone(),
            url: self.notify_webhook_url.clone(),
        }
    }

    pub fn staff_notifier(&self) -> WebhookStaffNotifier {
        WebhookStaffNotifier {
            client: self.http.clone(),
            url: self.staff_webhook_url.clone(),
        }
    }

    pub fn notification_dispatcher(
        &self,
    ) -> NotificationDispatcher<WebhookCustomerNotifier, WebhookStaffNotifier, RedisCartStore> {
        NotificationDispatcher {
            customers: self.customer_notifier(),
            staff: self.staff_notifier(),
            carts: self.cart_store(),
        }
    }
}
