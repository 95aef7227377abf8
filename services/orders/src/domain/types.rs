use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// How long a reservation for an in-flight event lives. A crash between
/// reserve and confirm leaves a marker that expires on its own, after which
/// the provider's redelivery goes through again.
pub const PENDING_MARKER_TTL_SECS: u64 = 120;

/// Retention for the marker of a successfully processed event. Provider
/// redelivery windows are shorter than a day.
pub const PROCESSED_MARKER_TTL_SECS: u64 = 24 * 60 * 60;

/// Order lifecycle. The only legal transitions are
/// pending -> completed, pending -> payment_failed and completed -> refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Completed,
    PaymentFailed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::PaymentFailed => "payment_failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "payment_failed" => Some(Self::PaymentFailed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// What an order line resolves to at fulfillment time. Courses grant an
/// enrollment, event bookings get confirmed, digital products need no
/// server-side grant beyond the completed order itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Course,
    EventBooking,
    DigitalProduct,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::EventBooking => "event_booking",
            Self::DigitalProduct => "digital_product",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course" => Some(Self::Course),
            "event_booking" => Some(Self::EventBooking),
            "digital_product" => Some(Self::DigitalProduct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: ItemKind,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Contact details for the confirmation message, read in the same
/// transaction that completes the order.
#[derive(Debug, Clone)]
pub struct CustomerContact {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A payment-provider event, already signature-verified upstream. `event_id`
/// is the provider's delivery id and the idempotency key. `raw` is the
/// original provider payload as forwarded by the gateway, logged when an
/// event cannot be acted on.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub event_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub order_id: Option<String>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CheckoutCompleted,
    PaymentFailed,
    ChargeRefunded,
    /// Any provider event type this service does not handle.
    #[serde(other)]
    Other,
}

/// What a provider event asks this service to do. The closed set keeps the
/// dispatch exhaustive; new provider event types land in `Ignored` until a
/// variant is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentIntent {
    CheckoutCompleted { order_id: String },
    PaymentFailed { order_id: String },
    Refunded { order_id: String },
    Ignored,
}

/// Terminal pipeline outcome, acknowledged to the provider with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// This delivery applied the transition (fulfilled, refunded or failed).
    Fulfilled,
    /// The work had already happened; nothing was written.
    AlreadyProcessed,
    /// Unhandled event type or no order reference.
    Ignored,
}

/// Result of a status-guarded update. `Stale` means the guarded `WHERE`
/// matched zero rows; it carries the status the row actually had so the
/// caller can tell a lost race from a forbidden transition.
#[derive(Debug, Clone)]
pub enum Transition<T> {
    Applied(T),
    Stale(OrderStatus),
}

/// Everything the notification fan-out needs after a fulfillment committed.
#[derive(Debug, Clone)]
pub struct FulfilledOrder {
    pub order: Order,
    pub contact: CustomerContact,
    pub items: Vec<OrderItem>,
    pub enrollments_granted: u64,
    pub bookings_confirmed: u64,
}

/// Summary of a committed refund.
#[derive(Debug, Clone)]
pub struct RefundedOrder {
    pub order: Order,
    pub enrollments_revoked: u64,
    pub bookings_cancelled: u64,
}
