use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::repository::{CartStore, CustomerNotifier, FulfillmentNotifier, StaffNotifier};
use crate::domain::types::{FulfilledOrder, RefundedOrder};
use crate::error::OrdersServiceError;

/// Outbound webhook timeout. Notifications are best-effort; a slow gateway
/// must not pin a task for long.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct OrderConfirmation<'a> {
    kind: &'static str,
    order_id: Uuid,
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    total_cents: i64,
    items: Vec<ItemLine>,
}

#[derive(Debug, Serialize)]
struct ItemLine {
    kind: &'static str,
    item_id: Uuid,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(Debug, Serialize)]
struct StaffAlert {
    kind: &'static str,
    order_id: Uuid,
    user_id: Uuid,
    total_cents: i64,
}

impl<'a> OrderConfirmation<'a> {
    fn from_fulfilled(fulfilled: &'a FulfilledOrder) -> Self {
        Self {
            kind: "order_confirmation",
            order_id: fulfilled.order.id,
            name: &fulfilled.contact.name,
            email: &fulfilled.contact.email,
            phone: fulfilled.contact.phone.as_deref(),
            total_cents: fulfilled.order.total_cents,
            items: fulfilled
                .items
                .iter()
                .map(|item| ItemLine {
                    kind: item.kind.as_str(),
                    item_id: item.item_id,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                })
                .collect(),
        }
    }
}

/// Sends order confirmations to the customer message gateway. A missing URL
/// disables the notifier, which is how dev environments run.
#[derive(Clone)]
pub struct WebhookCustomerNotifier {
    pub client: Client,
    pub url: Option<String>,
}

impl CustomerNotifier for WebhookCustomerNotifier {
    async fn order_confirmation(&self, fulfilled: &FulfilledOrder) -> Result<(), OrdersServiceError> {
        let Some(url) = &self.url else {
            tracing::debug!(order_id = %fulfilled.order.id, "customer notifications disabled");
            return Ok(());
        };

        post_json(&self.client, url, &OrderConfirmation::from_fulfilled(fulfilled)).await
    }
}

/// Sends sale and refund alerts to the staff channel webhook.
#[derive(Clone)]
pub struct WebhookStaffNotifier {
    pub client: Client,
    pub url: Option<String>,
}

impl StaffNotifier for WebhookStaffNotifier {
    async fn sale_alert(&self, fulfilled: &FulfilledOrder) -> Result<(), OrdersServiceError> {
        let Some(url) = &self.url else {
            tracing::debug!(order_id = %fulfilled.order.id, "staff alerts disabled");
            return Ok(());
        };

        let alert = StaffAlert {
            kind: "sale",
            order_id: fulfilled.order.id,
            user_id: fulfilled.order.user_id,
            total_cents: fulfilled.order.total_cents,
        };
        post_json(&self.client, url, &alert).await
    }

    async fn refund_alert(&self, refunded: &RefundedOrder) -> Result<(), OrdersServiceError> {
        let Some(url) = &self.url else {
            tracing::debug!(order_id = %refunded.order.id, "staff alerts disabled");
            return Ok(());
        };

        let alert = StaffAlert {
            kind: "refund",
            order_id: refunded.order.id,
            user_id: refunded.order.user_id,
            total_cents: refunded.order.total_cents,
        };
        post_json(&self.client, url, &alert).await
    }
}

async fn post_json<T: Serialize>(
    client: &Client,
    url: &str,
    payload: &T,
) -> Result<(), OrdersServiceError> {
    let response = client
        .post(url)
        .json(payload)
        .timeout(NOTIFY_TIMEOUT)
        .send()
        .await
        .map_err(|e| OrdersServiceError::Unavailable(e.into()))?;

    if !response.status().is_success() {
        return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "notification webhook returned {}",
            response.status()
        )));
    }

    Ok(())
}

/// Fans a committed fulfillment or refund out to the best-effort side
/// effects. Each target runs in its own task and logs its own failure; by
/// the time this runs the sale is durable, so nothing here can fail the
/// webhook response.
#[derive(Clone)]
pub struct NotificationDispatcher<C, T, K>
where
    C: CustomerNotifier + Clone + Send + 'static,
    T: StaffNotifier + Clone + Send + 'static,
    K: CartStore + Clone + Send + 'static,
{
    pub customers: C,
    pub staff: T,
    pub carts: K,
}

impl<C, T, K> FulfillmentNotifier for NotificationDispatcher<C, T, K>
where
    C: CustomerNotifier + Clone + Send + 'static,
    T: StaffNotifier + Clone + Send + 'static,
    K: CartStore + Clone + Send + 'static,
{
    async fn order_fulfilled(&self, fulfilled: &FulfilledOrder) {
        let customers = self.customers.clone();
        let payload = fulfilled.clone();
        tokio::spawn(async move {
            if let Err(err) = customers.order_confirmation(&payload).await {
                tracing::warn!(
                    order_id = %payload.order.id,
                    error = %err,
                    "customer confirmation failed"
                );
            }
        });

        let staff = self.staff.clone();
        let payload = fulfilled.clone();
        tokio::spawn(async move {
            if let Err(err) = staff.sale_alert(&payload).await {
                tracing::warn!(
                    order_id = %payload.order.id,
                    error = %err,
                    "staff sale alert failed"
                );
            }
        });

        let carts = self.carts.clone();
        let order_id = fulfilled.order.id;
        let user_id = fulfilled.order.user_id;
        tokio::spawn(async move {
            if let Err(err) = carts.clear_cart(user_id).await {
                tracing::warn!(
                    order_id = %order_id,
                    user_id = %user_id,
                    error = %err,
                    "cart clear failed"
                );
            }
        });
    }

    async fn order_refunded(&self, refunded: &RefundedOrder) {
        let staff = self.staff.clone();
        let payload = refunded.clone();
        tokio::spawn(async move {
            if let Err(err) = staff.refund_alert(&payload).await {
                tracing::warn!(
                    order_id = %payload.order.id,
                    error = %err,
                    "staff refund alert failed"
                );
            }
        });
    }
}
