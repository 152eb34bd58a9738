use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};

use crate::{
    audit::{self, AuditAction},
    dto::webhooks::{PAYMENT_SUCCEEDED, PaymentWebhookEvent},
    entity::orders::{ActiveModel as OrderActive, Model as OrderModel},
    error::{AppError, AppResult},
    events::{Notification, enqueue_task},
    models::{OrderStatus, PaymentStatus},
    repository::{OrderRepo, UnitOfWork, UserRepo},
    response::Ack,
    services::order_service::{order_created_event, parse_status},
    state::AppState,
};

#[derive(Debug)]
pub enum PaymentOutcome {
    Confirmed(OrderModel),
    /// Duplicate delivery; nothing was written.
    AlreadyPaid(OrderModel),
}

/// Mark the order behind `payment_intent_id` as paid and confirmed, exactly once.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    payment_intent_id: &str,
) -> AppResult<PaymentOutcome> {
    let uow = UnitOfWork::begin(db).await?;
    let order = uow
        .orders()
        .lock_by_payment_intent(payment_intent_id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(payment_intent_id.to_string()))?;

    if order.payment_status == PaymentStatus::Paid.as_str() {
        tracing::info!(order_id = order.id, payment_intent_id, "payment already recorded");
        return Ok(PaymentOutcome::AlreadyPaid(order));
    }

    let current = parse_status(&order.status)?;
    if !current.can_transition_to(OrderStatus::Confirmed) {
        return Err(AppError::InvalidTransition {
            from: current,
            to: OrderStatus::Confirmed,
        });
    }

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Confirmed.as_str().into());
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.paid_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());

    let order = uow.orders().save(active).await?;
    uow.commit().await?;

    tracing::info!(order_id = order.id, payment_intent_id, "payment confirmed");
    Ok(PaymentOutcome::Confirmed(order))
}

pub async fn handle_payment_event(state: &AppState, event: PaymentWebhookEvent) -> AppResult<Ack> {
    if event.kind != PAYMENT_SUCCEEDED {
        tracing::debug!(kind = %event.kind, "ignoring payment event");
        return Ok(Ack::with_detail("ignored"));
    }

    match confirm_payment(&state.orm, &event.data.object.id).await? {
        PaymentOutcome::AlreadyPaid(_) => Ok(Ack::with_detail("already_paid")),
        PaymentOutcome::Confirmed(order) => {
            audit::record(
                &state.pool,
                Some(order.user_id),
                AuditAction::OrderPaid,
                order.id,
                serde_json::json!({ "payment_intent_id": event.data.object.id }),
            )
            .await;
            dispatch_confirmed(state, &order).await;
            Ok(Ack::ok())
        }
    }
}

/// Re-schedule the warehouse stage and tell the customer. The task queued at creation
/// may already have exhausted its retries waiting for this payment; a second copy is
/// harmless because re-applying a status is a no-op. Both enqueues are best effort.
async fn dispatch_confirmed(state: &AppState, order: &OrderModel) {
    let loaded = async {
        let items = OrderRepo::new(&state.orm).items(order.id).await?;
        let user = UserRepo::new(&state.orm).find(order.user_id).await?;
        Ok::<_, AppError>((items, user))
    }
    .await;

    let (items, user) = match loaded {
        Ok((items, Some(user))) => (items, user),
        Ok((_, None)) => {
            tracing::warn!(order_id = order.id, "order owner missing, fulfillment not scheduled");
            return;
        }
        Err(err) => {
            tracing::warn!(order_id = order.id, error = %err, "failed to load confirmed order");
            return;
        }
    };

    let event = order_created_event(order, &items, user.email);
    if let Err(err) = enqueue_task(state.tasks.as_ref(), &event).await {
        tracing::error!(order_id = order.id, error = %err, "failed to enqueue warehouse task after payment");
    }

    let sent = match Notification::OrderConfirmed(event).to_request() {
        Ok(request) => enqueue_task(state.tasks.as_ref(), &request)
            .await
            .map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    if let Err(err) = sent {
        tracing::warn!(order_id = order.id, error = %err, "failed to enqueue confirmation notification");
    }
}
