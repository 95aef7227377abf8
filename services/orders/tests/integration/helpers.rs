use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use campus_orders::domain::repository::{
    CartStore, CustomerNotifier, FulfillmentNotifier, IdempotencyGuard, OrderStore, StaffNotifier,
};
use campus_orders::domain::types::{
    BookingStatus, CustomerContact, EventType, FulfilledOrder, ItemKind, Order, OrderItem,
    OrderStatus, PaymentEvent, RefundedOrder, Transition,
};
use campus_orders::error::OrdersServiceError;
use campus_orders::usecase::process_event::ProcessEventUseCase;

#[derive(Clone)]
pub struct StoredBooking {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: BookingStatus,
}

#[derive(Default)]
struct StoreState {
    orders: HashMap<Uuid, Order>,
    contacts: HashMap<Uuid, CustomerContact>,
    items: Vec<OrderItem>,
    enrollments: Vec<(Uuid, Uuid)>,
    bookings: Vec<StoredBooking>,
    fail_transitions: bool,
    last_stuck_query: Option<(DateTime<Utc>, u64)>,
}

/// In-memory `OrderStore` with real status-guarded transitions, so
/// idempotency and race behavior can be exercised without a database. Every
/// operation runs under one lock; when `fail_transitions` is set, transition
/// calls error before any write, like a rolled-back transaction.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryOrderStore {
    pub fn insert_order(&self, order: Order) {
        self.inner.lock().unwrap().orders.insert(order.id, order);
    }

    pub fn insert_contact(&self, contact: CustomerContact) {
        self.inner
            .lock()
            .unwrap()
            .contacts
            .insert(contact.user_id, contact);
    }

    pub fn insert_item(&self, item: OrderItem) {
        self.inner.lock().unwrap().items.push(item);
    }

    pub fn insert_booking(&self, booking: StoredBooking) {
        self.inner.lock().unwrap().bookings.push(booking);
    }

    pub fn insert_enrollment(&self, user_id: Uuid, course_id: Uuid) {
        self.inner
            .lock()
            .unwrap()
            .enrollments
            .push((user_id, course_id));
    }

    pub fn set_fail_transitions(&self, fail: bool) {
        self.inner.lock().unwrap().fail_transitions = fail;
    }

    pub fn order_status(&self, order_id: Uuid) -> Option<OrderStatus> {
        self.inner
            .lock()
            .unwrap()
            .orders
            .get(&order_id)
            .map(|o| o.status)
    }

    pub fn enrollment_exists(&self, user_id: Uuid, course_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap()
            .enrollments
            .contains(&(user_id, course_id))
    }

    pub fn enrollment_count(&self) -> usize {
        self.inner.lock().unwrap().enrollments.len()
    }

    pub fn booking_status(&self, booking_id: Uuid) -> Option<BookingStatus> {
        self.inner
            .lock()
            .unwrap()
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .map(|b| b.status)
    }

    pub fn last_stuck_query(&self) -> Option<(DateTime<Utc>, u64)> {
        self.inner.lock().unwrap().last_stuck_query
    }
}

impl OrderStore for MemoryOrderStore {
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, OrdersServiceError> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    async fn complete_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<FulfilledOrder>, OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_transitions {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "simulated transaction failure"
            )));
        }

        let Some(order) = state.orders.get(&order_id).cloned() else {
            return Err(OrdersServiceError::OrderNotFound);
        };
        if order.status != OrderStatus::Pending {
            return Ok(Transition::Stale(order.status));
        }

        let order = {
            let entry = state.orders.get_mut(&order_id).unwrap();
            entry.status = OrderStatus::Completed;
            entry.clone()
        };
        let contact = state
            .contacts
            .get(&order.user_id)
            .cloned()
            .ok_or_else(|| OrdersServiceError::Internal(anyhow::anyhow!("no contact seeded")))?;
        let items: Vec<OrderItem> = state
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();

        let mut enrollments_granted = 0;
        for item in items.iter().filter(|i| i.kind == ItemKind::Course) {
            let key = (order.user_id, item.item_id);
            if !state.enrollments.contains(&key) {
                state.enrollments.push(key);
                enrollments_granted += 1;
            }
        }

        let mut bookings_confirmed = 0;
        for booking in state.bookings.iter_mut().filter(|b| b.order_id == order_id) {
            if booking.status == BookingStatus::Pending {
                booking.status = BookingStatus::Confirmed;
                bookings_confirmed += 1;
            }
        }

        Ok(Transition::Applied(FulfilledOrder {
            order,
            contact,
            items,
            enrollments_granted,
            bookings_confirmed,
        }))
    }

    async fn refund_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<RefundedOrder>, OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_transitions {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "simulated transaction failure"
            )));
        }

        let Some(order) = state.orders.get(&order_id).cloned() else {
            return Err(OrdersServiceError::OrderNotFound);
        };
        if order.status != OrderStatus::Completed {
            return Ok(Transition::Stale(order.status));
        }

        let order = {
            let entry = state.orders.get_mut(&order_id).unwrap();
            entry.status = OrderStatus::Refunded;
            entry.clone()
        };
        let course_ids: Vec<Uuid> = state
            .items
            .iter()
            .filter(|i| i.order_id == order_id && i.kind == ItemKind::Course)
            .map(|i| i.item_id)
            .collect();

        let before = state.enrollments.len();
        state
            .enrollments
            .retain(|(user, course)| !(*user == order.user_id && course_ids.contains(course)));
        let enrollments_revoked = (before - state.enrollments.len()) as u64;

        let mut bookings_cancelled = 0;
        for booking in state.bookings.iter_mut().filter(|b| b.order_id == order_id) {
            if booking.status != BookingStatus::Cancelled {
                booking.status = BookingStatus::Cancelled;
                bookings_cancelled += 1;
            }
        }

        Ok(Transition::Applied(RefundedOrder {
            order,
            enrollments_revoked,
            bookings_cancelled,
        }))
    }

    async fn mark_payment_failed(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<()>, OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_transitions {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "simulated transaction failure"
            )));
        }

        let Some(order) = state.orders.get(&order_id).cloned() else {
            return Err(OrdersServiceError::OrderNotFound);
        };
        if order.status != OrderStatus::Pending {
            return Ok(Transition::Stale(order.status));
        }

        state.orders.get_mut(&order_id).unwrap().status = OrderStatus::PaymentFailed;
        Ok(Transition::Applied(()))
    }

    async fn list_stuck_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        state.last_stuck_query = Some((cutoff, limit));

        let mut stuck: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect();
        stuck.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        stuck.truncate(limit as usize);
        Ok(stuck)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Marker {
    Pending,
    Done,
}

#[derive(Default)]
struct GuardState {
    markers: HashMap<String, Marker>,
    unreachable: bool,
}

/// In-memory guard with the same atomic claim semantics as the Redis one.
#[derive(Clone, Default)]
pub struct MemoryIdempotencyGuard {
    inner: Arc<Mutex<GuardState>>,
}

impl MemoryIdempotencyGuard {
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unwrap().unreachable = unreachable;
    }

    pub fn has_marker(&self, event_id: &str) -> bool {
        self.inner.lock().unwrap().markers.contains_key(event_id)
    }

    pub fn is_confirmed(&self, event_id: &str) -> bool {
        self.inner.lock().unwrap().markers.get(event_id) == Some(&Marker::Done)
    }
}

impl IdempotencyGuard for MemoryIdempotencyGuard {
    async fn try_reserve(&self, event_id: &str) -> Result<bool, OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.unreachable {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "marker store offline"
            )));
        }
        match state.markers.entry(event_id.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(Marker::Pending);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn confirm(&self, event_id: &str) -> Result<(), OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.unreachable {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "marker store offline"
            )));
        }
        state.markers.insert(event_id.to_owned(), Marker::Done);
        Ok(())
    }

    async fn release(&self, event_id: &str) -> Result<(), OrdersServiceError> {
        let mut state = self.inner.lock().unwrap();
        if state.unreachable {
            return Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
                "marker store offline"
            )));
        }
        state.markers.remove(event_id);
        Ok(())
    }
}

/// Records what the pipeline hands to the notification layer.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    fulfilled: Arc<Mutex<Vec<FulfilledOrder>>>,
    refunded: Arc<Mutex<Vec<RefundedOrder>>>,
}

impl RecordingNotifier {
    pub fn fulfilled_order_ids(&self) -> Vec<Uuid> {
        self.fulfilled
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.order.id)
            .collect()
    }

    pub fn refunded_order_ids(&self) -> Vec<Uuid> {
        self.refunded
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.order.id)
            .collect()
    }
}

impl FulfillmentNotifier for RecordingNotifier {
    async fn order_fulfilled(&self, fulfilled: &FulfilledOrder) {
        self.fulfilled.lock().unwrap().push(fulfilled.clone());
    }

    async fn order_refunded(&self, refunded: &RefundedOrder) {
        self.refunded.lock().unwrap().push(refunded.clone());
    }
}

/// Leaf notification targets that always error, for exercising the
/// dispatcher's no-throw contract end to end.
#[derive(Clone, Copy)]
pub struct FailingTargets;

impl CustomerNotifier for FailingTargets {
    async fn order_confirmation(
        &self,
        _fulfilled: &FulfilledOrder,
    ) -> Result<(), OrdersServiceError> {
        Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "message gateway down"
        )))
    }
}

impl StaffNotifier for FailingTargets {
    async fn sale_alert(&self, _fulfilled: &FulfilledOrder) -> Result<(), OrdersServiceError> {
        Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "staff webhook down"
        )))
    }

    async fn refund_alert(&self, _refunded: &RefundedOrder) -> Result<(), OrdersServiceError> {
        Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "staff webhook down"
        )))
    }
}

impl CartStore for FailingTargets {
    async fn clear_cart(&self, _user_id: Uuid) -> Result<(), OrdersServiceError> {
        Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "cart store down"
        )))
    }
}

pub fn test_contact(user_id: Uuid) -> CustomerContact {
    CustomerContact {
        user_id,
        name: "Maya Lindqvist".to_owned(),
        email: "maya@example.com".to_owned(),
        phone: Some("+46701234567".to_owned()),
    }
}

pub fn test_order(user_id: Uuid, status: OrderStatus) -> Order {
    Order {
        id: Uuid::new_v4(),
        user_id,
        total_cents: 49_900,
        status,
        created_at: Utc::now(),
    }
}

pub fn course_item(order_id: Uuid, course_id: Uuid) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        order_id,
        kind: ItemKind::Course,
        item_id: course_id,
        quantity: 1,
        unit_price_cents: 39_900,
    }
}

pub fn booking_order_item(order_id: Uuid, event_id: Uuid) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        order_id,
        kind: ItemKind::EventBooking,
        item_id: event_id,
        quantity: 1,
        unit_price_cents: 10_000,
    }
}

pub struct Seeded {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub booking_id: Uuid,
}

/// The everyday checkout: one pending order holding a course and an event
/// booking, contact details seeded.
pub fn seed_pending_order(store: &MemoryOrderStore) -> Seeded {
    let user_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    let order = test_order(user_id, OrderStatus::Pending);
    let order_id = order.id;

    store.insert_contact(test_contact(user_id));
    store.insert_order(order);
    store.insert_item(course_item(order_id, course_id));
    store.insert_item(booking_order_item(order_id, event_id));
    store.insert_booking(StoredBooking {
        id: booking_id,
        order_id,
        status: BookingStatus::Pending,
    });

    Seeded {
        order_id,
        user_id,
        course_id,
        booking_id,
    }
}

/// The same scenario after fulfillment already ran: completed order,
/// enrollment granted, booking confirmed.
pub fn seed_completed_order(store: &MemoryOrderStore) -> Seeded {
    let user_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    let order = test_order(user_id, OrderStatus::Completed);
    let order_id = order.id;

    store.insert_contact(test_contact(user_id));
    store.insert_order(order);
    store.insert_item(course_item(order_id, course_id));
    store.insert_item(booking_order_item(order_id, event_id));
    store.insert_booking(StoredBooking {
        id: booking_id,
        order_id,
        status: BookingStatus::Confirmed,
    });
    store.insert_enrollment(user_id, course_id);

    Seeded {
        order_id,
        user_id,
        course_id,
        booking_id,
    }
}

pub fn payment_event(event_id: &str, event_type: EventType, order_id: Uuid) -> PaymentEvent {
    PaymentEvent {
        event_id: event_id.to_owned(),
        event_type,
        order_id: Some(order_id.to_string()),
        raw: serde_json::Value::Null,
    }
}

pub fn pipeline(
    guard: &MemoryIdempotencyGuard,
    store: &MemoryOrderStore,
    notifier: &RecordingNotifier,
) -> ProcessEventUseCase<MemoryIdempotencyGuard, MemoryOrderStore, RecordingNotifier> {
    ProcessEventUseCase {
        guard: guard.clone(),
        store: store.clone(),
        notifier: notifier.clone(),
    }
}
