use sea_orm::Database;
use tracing::info;

use campus_orders::config::OrdersConfig;
use campus_orders::router::build_router;
use campus_orders::state::AppState;

#[tokio::main]
async fn main() {
    campus_core::tracing::init_tracing();

    let config = OrdersConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis = deadpool_redis::Config::from_url(&config.redis_url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create redis pool");

    let http = reqwest::Client::new();

    let state = AppState {
        db,
        redis,
        http,
        notify_webhook_url: config.notify_webhook_url,
        staff_webhook_url: config.staff_webhook_url,
    };

    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.orders_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    info!("orders service listening on {addr}");
    axum::serve(listener, router)
        .await
        .expect("server stopped unexpectedly");
}
