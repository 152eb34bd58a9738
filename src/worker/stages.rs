//! Warehouse, shipping and delivery handlers.
//!
//! Each stage waits out its simulated handling time, reports the new status to the
//! API and only then schedules what comes next. A failed status callback aborts the
//! stage before anything is enqueued; the queue redelivers the whole task.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use uuid::Uuid;

use crate::{
    dto::orders::UpdateOrderStatusRequest,
    events::{
        Notification, OrderCreatedEvent, OrderDeliveredEvent, OrderPackedEvent,
        OrderShippedEvent, enqueue_task,
    },
    models::OrderStatus,
    worker::{api_client::CallbackError, error::WorkerError, state::WorkerState},
};

/// Warehouse: `confirmed -> processing`, then schedule shipping.
pub async fn process_order_created(
    state: &WorkerState,
    event: OrderCreatedEvent,
) -> Result<OrderPackedEvent, WorkerError> {
    tracing::info!(order_id = event.order_id, items = event.items.len(), "packing order");
    tokio::time::sleep(state.stages.warehouse_delay).await;

    state
        .orders
        .update_status(
            event.order_id,
            &UpdateOrderStatusRequest::new(OrderStatus::Processing),
        )
        .await?;

    let packed = OrderPackedEvent {
        order_id: event.order_id,
        order_number: event.order_number,
        user_id: event.user_id,
        user_email: event.user_email,
        packed_at: Utc::now(),
    };
    enqueue_task(state.tasks.as_ref(), &packed).await?;
    notify(state, Notification::OrderPacked(packed.clone())).await;

    Ok(packed)
}

/// Shipping: `processing -> shipped` with a tracking number and delivery estimate.
///
/// The values proposed here only stick on the first delivery. The events are built
/// from what the API reports as stored, so a redelivered task repeats them.
pub async fn process_order_packed(
    state: &WorkerState,
    event: OrderPackedEvent,
) -> Result<OrderShippedEvent, WorkerError> {
    tracing::info!(order_id = event.order_id, "shipping order");
    tokio::time::sleep(state.stages.shipping_delay).await;

    let shipped_at = Utc::now();
    let mut update = UpdateOrderStatusRequest::new(OrderStatus::Shipped);
    update.tracking_number = Some(generate_tracking_number());
    update.estimated_delivery_date = Some(add_business_days(
        shipped_at,
        state.stages.delivery_business_days,
    ));
    let stored = state.orders.update_status(event.order_id, &update).await?;

    let missing = |field: &'static str| CallbackError::Incomplete {
        order_id: event.order_id,
        status: stored.status.to_string(),
        field,
    };
    let tracking_number = stored
        .tracking_number
        .clone()
        .ok_or_else(|| missing("tracking_number"))?;
    let estimated_delivery_date = stored
        .estimated_delivery_date
        .ok_or_else(|| missing("estimated_delivery_date"))?;
    if update.tracking_number.as_deref() != Some(tracking_number.as_str()) {
        tracing::info!(order_id = event.order_id, %tracking_number, "order already shipped, reusing stored tracking");
    }

    let shipped = OrderShippedEvent {
        order_id: event.order_id,
        order_number: event.order_number,
        user_id: event.user_id,
        user_email: event.user_email,
        tracking_number,
        shipped_at,
        estimated_delivery_date,
    };
    enqueue_task(state.tasks.as_ref(), &shipped).await?;
    notify(state, Notification::OrderShipped(shipped.clone())).await;

    Ok(shipped)
}

/// Delivery: `shipped -> delivered`. Last stage, so only the customer is told.
pub async fn process_order_shipped(
    state: &WorkerState,
    event: OrderShippedEvent,
) -> Result<OrderDeliveredEvent, WorkerError> {
    tracing::info!(order_id = event.order_id, tracking_number = %event.tracking_number, "delivering order");
    tokio::time::sleep(state.stages.delivery_delay).await;

    state
        .orders
        .update_status(
            event.order_id,
            &UpdateOrderStatusRequest::new(OrderStatus::Delivered),
        )
        .await?;

    let delivered = OrderDeliveredEvent {
        order_id: event.order_id,
        order_number: event.order_number,
        user_id: event.user_id,
        user_email: event.user_email,
        delivered_at: Utc::now(),
    };
    notify(state, Notification::OrderDelivered(delivered.clone())).await;

    Ok(delivered)
}

/// Best effort: a lost notification never holds up the order.
async fn notify(state: &WorkerState, notification: Notification) {
    let kind = notification.kind();
    let request = match notification.to_request() {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(%kind, error = %err, "failed to build notification");
            return;
        }
    };
    if let Err(err) = enqueue_task(state.tasks.as_ref(), &request).await {
        tracing::warn!(%kind, error = %err, "failed to enqueue notification");
    }
}

/// Move `days` working days forward from `start`, skipping Saturdays and Sundays.
pub fn add_business_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let mut date = start;
    let mut added = 0;
    while added < days {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            added += 1;
        }
    }
    date
}

fn generate_tracking_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TRK{}", &id[..12])
}
