use crate::domain::types::{EventType, FulfillmentIntent, PaymentEvent};

/// Map a verified provider event onto a fulfillment intent.
///
/// Unhandled event types and recognized events without an order reference
/// are `Ignored`, never errors. The caller acknowledges them with 200 so the
/// provider stops redelivering something this service will never act on.
pub fn classify(event: &PaymentEvent) -> FulfillmentIntent {
    match (event.event_type, event.order_id.as_deref()) {
        (EventType::Other, _) => FulfillmentIntent::Ignored,
        (EventType::CheckoutCompleted, Some(id)) => FulfillmentIntent::CheckoutCompleted {
            order_id: id.to_owned(),
        },
        (EventType::PaymentFailed, Some(id)) => FulfillmentIntent::PaymentFailed {
            order_id: id.to_owned(),
        },
        (EventType::ChargeRefunded, Some(id)) => FulfillmentIntent::Refunded {
            order_id: id.to_owned(),
        },
        (_, None) => {
            tracing::warn!(
                event_id = %event.event_id,
                event_type = ?event.event_type,
                raw = %event.raw,
                "recognized event carries no order id, ignoring"
            );
            FulfillmentIntent::Ignored
        }
    }
}
