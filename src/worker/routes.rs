use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::{get, post},
};

use crate::{
    events::{
        NOTIFICATION_REQUEST_PATH, NotificationRequestEvent, ORDER_CREATED_PATH,
        ORDER_PACKED_PATH, ORDER_SHIPPED_PATH, OrderCreatedEvent, OrderPackedEvent,
        OrderShippedEvent,
    },
    middleware::auth::{bearer_token, tokens_match},
    response::{Ack, ApiResponse},
    routes::health::{self, HealthData},
    worker::{error::WorkerError, notifications, stages, state::WorkerState},
};

/// A delivery from the task queue, authenticated by the shared worker token.
#[derive(Debug, Clone, Copy)]
pub struct TaskCaller;

impl FromRequestParts<WorkerState> for TaskCaller {
    type Rejection = WorkerError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &WorkerState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(WorkerError::Unauthorized)?;
        if !tokens_match(token, &state.auth_token) {
            return Err(WorkerError::Unauthorized);
        }
        Ok(TaskCaller)
    }
}

pub fn router(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(worker_health))
        .route(ORDER_CREATED_PATH, post(handle_order_created))
        .route(ORDER_PACKED_PATH, post(handle_order_packed))
        .route(ORDER_SHIPPED_PATH, post(handle_order_shipped))
        .route(NOTIFICATION_REQUEST_PATH, post(handle_notification_request))
        .with_state(state)
}

async fn worker_health() -> Json<ApiResponse<HealthData>> {
    health::report("worker")
}

async fn handle_order_created(
    State(state): State<WorkerState>,
    _caller: TaskCaller,
    Json(event): Json<OrderCreatedEvent>,
) -> Result<Json<Ack>, WorkerError> {
    stages::process_order_created(&state, event).await?;
    Ok(Json(Ack::ok()))
}

async fn handle_order_packed(
    State(state): State<WorkerState>,
    _caller: TaskCaller,
    Json(event): Json<OrderPackedEvent>,
) -> Result<Json<Ack>, WorkerError> {
    stages::process_order_packed(&state, event).await?;
    Ok(Json(Ack::ok()))
}

async fn handle_order_shipped(
    State(state): State<WorkerState>,
    _caller: TaskCaller,
    Json(event): Json<OrderShippedEvent>,
) -> Result<Json<Ack>, WorkerError> {
    stages::process_order_shipped(&state, event).await?;
    Ok(Json(Ack::ok()))
}

async fn handle_notification_request(
    State(state): State<WorkerState>,
    _caller: TaskCaller,
    Json(request): Json<NotificationRequestEvent>,
) -> Result<Json<Ack>, WorkerError> {
    let kind = notifications::dispatch_notification(state.mailer.as_ref(), &request).await?;
    Ok(Json(Ack::with_detail(kind.as_str())))
}
