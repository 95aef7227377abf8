/// Orders service configuration, loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL. Holds processed-event markers and active carts.
    pub redis_url: String,
    /// Message-gateway endpoint for customer confirmations. Unset disables them.
    pub notify_webhook_url: Option<String>,
    /// Staff alert endpoint. Unset disables staff alerts.
    pub staff_webhook_url: Option<String>,
    /// Port to listen on.
    pub orders_port: u16,
}

impl OrdersConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            staff_webhook_url: std::env::var("STAFF_WEBHOOK_URL").ok(),
            orders_port: std::env::var("ORDERS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3140),
        }
    }
}
