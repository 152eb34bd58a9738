//! Periodic cleanup run by the `maintenance` binary.

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, Set};

use crate::{
    audit::{self, AuditAction},
    db::DbPool,
    entity::orders::ActiveModel as OrderActive,
    error::AppResult,
    models::{OrderStatus, PaymentStatus},
    repository::{CartRepo, OrderRepo, UnitOfWork},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub cancelled_orders: usize,
    pub reaped_carts: u64,
}

/// Cancel orders that never got paid and return their quantities to stock.
///
/// Each order runs in its own unit of work. The status is re-read under lock, so an
/// order confirmed by a concurrent webhook is left alone.
pub async fn cancel_stale_orders(
    db: &DatabaseConnection,
    pool: &DbPool,
    older_than: Duration,
) -> AppResult<usize> {
    let cutoff = Utc::now() - older_than;
    let candidates = OrderRepo::new(db).pending_payment_before(cutoff).await?;

    let mut cancelled = 0;
    for order_id in candidates {
        match cancel_order(db, order_id).await {
            Ok(Some(user_id)) => {
                cancelled += 1;
                audit::record(
                    pool,
                    Some(user_id),
                    AuditAction::OrderCancelled,
                    order_id,
                    serde_json::json!({ "reason": "payment_timeout" }),
                )
                .await;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(order_id, error = %err, "failed to cancel stale order"),
        }
    }
    Ok(cancelled)
}

async fn cancel_order(db: &DatabaseConnection, order_id: i64) -> AppResult<Option<uuid::Uuid>> {
    let uow = UnitOfWork::begin(db).await?;
    let Some(order) = uow.orders().lock(order_id).await? else {
        uow.rollback().await?;
        return Ok(None);
    };
    if order.status != OrderStatus::PendingPayment.as_str() {
        tracing::debug!(order_id, status = %order.status, "order moved on, not cancelling");
        uow.rollback().await?;
        return Ok(None);
    }

    let mut items = uow.orders().items(order_id).await?;
    items.sort_by_key(|item| item.product_id);
    for item in &items {
        // Same lock order as order creation.
        uow.products().lock(item.product_id).await?;
        uow.products()
            .adjust_stock(item.product_id, item.quantity)
            .await?;
    }

    let user_id = order.user_id;
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().into());
    active.payment_status = Set(PaymentStatus::Failed.as_str().into());
    active.updated_at = Set(Utc::now().into());
    uow.orders().save(active).await?;
    uow.commit().await?;

    tracing::info!(order_id, restocked = items.len(), "stale order cancelled");
    Ok(Some(user_id))
}

/// Delete anonymous carts untouched for `older_than`; their items cascade.
pub async fn reap_anonymous_carts(db: &DatabaseConnection, older_than: Duration) -> AppResult<u64> {
    let cutoff = Utc::now() - older_than;
    let reaped = CartRepo::new(db).delete_anonymous_before(cutoff).await?;
    if reaped > 0 {
        tracing::info!(reaped, "anonymous carts removed");
    }
    Ok(reaped)
}

pub async fn sweep(
    db: &DatabaseConnection,
    pool: &DbPool,
    order_ttl: Duration,
    cart_ttl: Duration,
) -> AppResult<SweepReport> {
    Ok(SweepReport {
        cancelled_orders: cancel_stale_orders(db, pool, order_ttl).await?,
        reaped_carts: reap_anonymous_carts(db, cart_ttl).await?,
    })
}
