//! One sweep per invocation; schedule it with cron.

use anyhow::Context;
use chrono::Duration;
use order_fulfillment::{
    db::{create_orm_conn, create_pool},
    services::maintenance_service,
    telemetry,
};

fn minutes_from_env(key: &str, default: i64) -> Duration {
    let minutes = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default);
    Duration::minutes(minutes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;

    let order_ttl = minutes_from_env("PENDING_ORDER_TTL_MINUTES", 60);
    let cart_ttl = minutes_from_env("ANONYMOUS_CART_TTL_MINUTES", 7 * 24 * 60);

    let report = maintenance_service::sweep(&orm, &pool, order_ttl, cart_ttl).await?;
    tracing::info!(
        cancelled_orders = report.cancelled_orders,
        reaped_carts = report.reaped_carts,
        "maintenance sweep finished"
    );
    Ok(())
}
