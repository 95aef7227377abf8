use chrono::{Duration, Utc};
use uuid::Uuid;

use campus_orders::domain::types::OrderStatus;
use campus_orders::usecase::stuck_orders::ListStuckOrdersUseCase;

use crate::helpers::{MemoryOrderStore, test_order};

#[tokio::test]
async fn should_list_pending_orders_older_than_the_cutoff_newest_first() {
    let store = MemoryOrderStore::default();

    let mut two_hours = test_order(Uuid::new_v4(), OrderStatus::Pending);
    two_hours.created_at = Utc::now() - Duration::hours(2);
    let two_hours_id = two_hours.id;
    store.insert_order(two_hours);

    let mut three_hours = test_order(Uuid::new_v4(), OrderStatus::Pending);
    three_hours.created_at = Utc::now() - Duration::hours(3);
    let three_hours_id = three_hours.id;
    store.insert_order(three_hours);

    let mut old_completed = test_order(Uuid::new_v4(), OrderStatus::Completed);
    old_completed.created_at = Utc::now() - Duration::hours(2);
    store.insert_order(old_completed);

    // Fresh pending order, not stuck yet.
    store.insert_order(test_order(Uuid::new_v4(), OrderStatus::Pending));

    let usecase = ListStuckOrdersUseCase {
        store: store.clone(),
    };
    let stuck = usecase.execute(Some(30), None).await.unwrap();

    let ids: Vec<Uuid> = stuck.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![two_hours_id, three_hours_id]);
}

#[tokio::test]
async fn should_clamp_age_and_limit_to_sane_bounds() {
    let store = MemoryOrderStore::default();
    let usecase = ListStuckOrdersUseCase {
        store: store.clone(),
    };

    usecase.execute(Some(-10), Some(10_000)).await.unwrap();

    let (cutoff, limit) = store.last_stuck_query().unwrap();
    assert_eq!(limit, 100);
    // A negative age clamps to one minute back.
    let age = Utc::now() - cutoff;
    assert!(
        age >= Duration::seconds(55) && age <= Duration::seconds(65),
        "cutoff should sit about a minute back, got {age}"
    );

    // An absurdly large age clamps to the cap; the cutoff subtraction must
    // not overflow.
    usecase.execute(Some(200_000_000_000), None).await.unwrap();

    let (cutoff, _) = store.last_stuck_query().unwrap();
    let age = Utc::now() - cutoff;
    assert!(
        age >= Duration::days(365) && age <= Duration::days(367),
        "cutoff should sit about a year back, got {age}"
    );
}
