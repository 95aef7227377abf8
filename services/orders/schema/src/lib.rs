//! sea-orm entities for the orders service database.

pub mod bookings;
pub mod enrollments;
pub mod order_items;
pub mod orders;
pub mod users;
