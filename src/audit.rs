use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Order lifecycle events worth a permanent trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    OrderCreated,
    OrderPaid,
    OrderCancelled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderCreated => "order_created",
            AuditAction::OrderPaid => "order_paid",
            AuditAction::OrderCancelled => "order_cancelled",
        }
    }
}

pub async fn insert_entry(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    order_id: i64,
    metadata: Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(format!("orders/{order_id}"))
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes never fail the surrounding operation.
pub async fn record(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    order_id: i64,
    metadata: Value,
) {
    if let Err(err) = insert_entry(pool, user_id, action, order_id, metadata).await {
        tracing::warn!(error = %err, action = action.as_str(), order_id, "audit log failed");
    }
}
