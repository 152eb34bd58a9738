use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use crate::{
    dto::orders::{OrderStatusReceipt, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::auth::InternalCaller,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/orders/{id}/status", post(update_order_status))
}

#[utoipa::path(
    post,
    path = "/internal/orders/{id}/status",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status applied, or already current; body holds the stored values", body = OrderStatusReceipt),
        (status = 401, description = "Missing or wrong internal token"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Not the next step of the order lifecycle"),
    ),
    security(("internal_token" = [])),
    tag = "Internal"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<OrderStatusReceipt>> {
    let order = order_service::apply_status_update(&state.orm, id, payload).await?;
    Ok(Json(order_service::status_receipt(&order)?))
}
