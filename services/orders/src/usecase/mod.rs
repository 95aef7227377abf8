pub mod classify;
pub mod fulfill;
pub mod payment_failure;
pub mod process_event;
pub mod refund;
pub mod stuck_orders;
