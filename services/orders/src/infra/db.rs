use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use campus_orders_schema::{bookings, enrollments, order_items, orders, users};

use crate::domain::repository::OrderStore;
use crate::domain::types::{
    BookingStatus, CustomerContact, FulfilledOrder, ItemKind, Order, OrderItem, OrderStatus,
    RefundedOrder, Transition,
};
use crate::error::OrdersServiceError;

/// Upper bound for one fulfillment or refund transaction. On expiry the
/// transaction future is dropped, the connection rolls back, and the caller
/// gets a retryable error.
const TXN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct DbOrderStore {
    pub db: DatabaseConnection,
}

impl OrderStore for DbOrderStore {
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, OrdersServiceError> {
        orders::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .and_then(|model| model.map(order_from_model).transpose())
            .map_err(unavailable("find order"))
    }

    async fn complete_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<FulfilledOrder>, OrdersServiceError> {
        let txn = self
            .db
            .transaction::<_, Transition<FulfilledOrder>, sea_orm::DbErr>(move |txn| {
                Box::pin(async move { complete_order_txn(txn, order_id).await })
            });
        run_guarded("complete order transaction", txn).await
    }

    async fn refund_order(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<RefundedOrder>, OrdersServiceError> {
        let txn = self
            .db
            .transaction::<_, Transition<RefundedOrder>, sea_orm::DbErr>(move |txn| {
                Box::pin(async move { refund_order_txn(txn, order_id).await })
            });
        run_guarded("refund order transaction", txn).await
    }

    async fn mark_payment_failed(
        &self,
        order_id: Uuid,
    ) -> Result<Transition<()>, OrdersServiceError> {
        let txn = self
            .db
            .transaction::<_, Transition<()>, sea_orm::DbErr>(move |txn| {
                Box::pin(async move { fail_order_txn(txn, order_id).await })
            });
        run_guarded("mark payment failed transaction", txn).await
    }

    async fn list_stuck_pending(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        let models = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::Column::CreatedAt.lt(cutoff))
            .order_by_desc(orders::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(unavailable("list stuck pending orders"))?;

        models
            .into_iter()
            .map(order_from_model)
            .collect::<Result<_, _>>()
            .map_err(unavailable("decode stuck pending orders"))
    }
}

/// pending -> completed, then grant the entitlements of every line item.
/// The guarded update comes first; zero rows means something else moved the
/// order and the rest of the transaction never runs.
async fn complete_order_txn(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<Transition<FulfilledOrder>, sea_orm::DbErr> {
    let updated = orders::Entity::update_many()
        .col_expr(
            orders::Column::Status,
            Expr::value(OrderStatus::Completed.as_str()),
        )
        .filter(orders::Column::Id.eq(order_id))
        .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return stale_status(txn, order_id).await;
    }

    let order = load_order(txn, order_id).await?;
    let contact = load_contact(txn, order.user_id).await?;
    let items = load_items(txn, order_id).await?;

    // Course grants are keyed on (user_id, course_id), so a rerun inserts
    // nothing and only genuinely new rows are counted.
    let mut enrollments_granted = 0;
    let now = Utc::now();
    for item in items.iter().filter(|i| i.kind == ItemKind::Course) {
        let enrollment = enrollments::ActiveModel {
            user_id: Set(order.user_id),
            course_id: Set(item.item_id),
            enrolled_at: Set(now),
        };
        enrollments_granted += enrollments::Entity::insert(enrollment)
            .on_conflict(
                OnConflict::columns([enrollments::Column::UserId, enrollments::Column::CourseId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;
    }

    let confirmed = bookings::Entity::update_many()
        .col_expr(
            bookings::Column::Status,
            Expr::value(BookingStatus::Confirmed.as_str()),
        )
        .filter(bookings::Column::OrderId.eq(order_id))
        .filter(bookings::Column::Status.eq(BookingStatus::Pending.as_str()))
        .exec(txn)
        .await?;

    Ok(Transition::Applied(FulfilledOrder {
        order,
        contact,
        items,
        enrollments_granted,
        bookings_confirmed: confirmed.rows_affected,
    }))
}

/// completed -> refunded, then take back what fulfillment granted.
async fn refund_order_txn(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<Transition<RefundedOrder>, sea_orm::DbErr> {
    let updated = orders::Entity::update_many()
        .col_expr(
            orders::Column::Status,
            Expr::value(OrderStatus::Refunded.as_str()),
        )
        .filter(orders::Column::Id.eq(order_id))
        .filter(orders::Column::Status.eq(OrderStatus::Completed.as_str()))
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return stale_status(txn, order_id).await;
    }

    let order = load_order(txn, order_id).await?;
    let items = load_items(txn, order_id).await?;

    let course_ids: Vec<Uuid> = items
        .iter()
        .filter(|i| i.kind == ItemKind::Course)
        .map(|i| i.item_id)
        .collect();
    let revoked = if course_ids.is_empty() {
        0
    } else {
        enrollments::Entity::delete_many()
            .filter(enrollments::Column::UserId.eq(order.user_id))
            .filter(enrollments::Column::CourseId.is_in(course_ids))
            .exec(txn)
            .await?
            .rows_affected
    };

    let cancelled = bookings::Entity::update_many()
        .col_expr(
            bookings::Column::Status,
            Expr::value(BookingStatus::Cancelled.as_str()),
        )
        .filter(bookings::Column::OrderId.eq(order_id))
        .filter(bookings::Column::Status.ne(BookingStatus::Cancelled.as_str()))
        .exec(txn)
        .await?;

    Ok(Transition::Applied(RefundedOrder {
        order,
        enrollments_revoked: revoked,
        bookings_cancelled: cancelled.rows_affected,
    }))
}

/// pending -> payment_failed. A plain guarded flip, no side effects.
async fn fail_order_txn(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<Transition<()>, sea_orm::DbErr> {
    let updated = orders::Entity::update_many()
        .col_expr(
            orders::Column::Status,
            Expr::value(OrderStatus::PaymentFailed.as_str()),
        )
        .filter(orders::Column::Id.eq(order_id))
        .filter(orders::Column::Status.eq(OrderStatus::Pending.as_str()))
        .exec(txn)
        .await?;
    if updated.rows_affected == 0 {
        return stale_status(txn, order_id).await;
    }

    Ok(Transition::Applied(()))
}

/// The guard matched zero rows. Re-read inside the same transaction to
/// report what the row actually holds; a vanished row surfaces as not found.
async fn stale_status<T>(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<Transition<T>, sea_orm::DbErr> {
    let order = load_order(txn, order_id).await?;
    Ok(Transition::Stale(order.status))
}

async fn load_order(txn: &DatabaseTransaction, id: Uuid) -> Result<Order, sea_orm::DbErr> {
    let model = orders::Entity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("order {id}")))?;
    order_from_model(model)
}

async fn load_contact(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> Result<CustomerContact, sea_orm::DbErr> {
    let model = users::Entity::find_by_id(user_id)
        .one(txn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("user {user_id}")))?;

    Ok(CustomerContact {
        user_id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
    })
}

async fn load_items(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<Vec<OrderItem>, sea_orm::DbErr> {
    let models = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .all(txn)
        .await?;

    models.into_iter().map(item_from_model).collect()
}

fn order_from_model(model: orders::Model) -> Result<Order, sea_orm::DbErr> {
    let status = OrderStatus::parse(&model.status).ok_or_else(|| {
        sea_orm::DbErr::Custom(format!("unknown order status '{}'", model.status))
    })?;

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_cents: model.total_cents,
        status,
        created_at: model.created_at,
    })
}

fn item_from_model(model: order_items::Model) -> Result<OrderItem, sea_orm::DbErr> {
    let kind = ItemKind::parse(&model.kind)
        .ok_or_else(|| sea_orm::DbErr::Custom(format!("unknown item kind '{}'", model.kind)))?;

    Ok(OrderItem {
        id: model.id,
        order_id: model.order_id,
        kind,
        item_id: model.item_id,
        quantity: model.quantity,
        unit_price_cents: model.unit_price_cents,
    })
}

/// Await a transition transaction under the timeout and translate failures:
/// a vanished order row maps to not found, everything else is retryable.
async fn run_guarded<T, F>(op: &'static str, txn: F) -> Result<Transition<T>, OrdersServiceError>
where
    F: Future<Output = Result<Transition<T>, sea_orm::TransactionError<sea_orm::DbErr>>>,
{
    match tokio::time::timeout(TXN_TIMEOUT, txn).await {
        Ok(Ok(transition)) => Ok(transition),
        Ok(Err(sea_orm::TransactionError::Transaction(sea_orm::DbErr::RecordNotFound(_)))) => {
            Err(OrdersServiceError::OrderNotFound)
        }
        Ok(Err(err)) => Err(unavailable(op)(err)),
        Err(_) => Err(OrdersServiceError::Unavailable(anyhow::anyhow!(
            "{op} timed out after {TXN_TIMEOUT:?}"
        ))),
    }
}

fn unavailable<E>(context: &'static str) -> impl FnOnce(E) -> OrdersServiceError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| OrdersServiceError::Unavailable(anyhow::Error::new(e).context(context))
}
