mod helpers;

mod stuck_orders_test;
