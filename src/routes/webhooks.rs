use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::webhooks::PaymentWebhookEvent,
    error::{AppError, AppResult},
    payments::signature,
    response::Ack,
    services::webhook_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/payment", post(payment_webhook))
}

#[utoipa::path(
    post,
    path = "/webhooks/payment",
    request_body(content = serde_json::Value, description = "Gateway event, verified against the raw body"),
    responses(
        (status = 200, description = "Event accepted (also for duplicates)", body = Ack),
        (status = 400, description = "Malformed event or bad signature"),
        (status = 404, description = "No order for the payment intent"),
        (status = 409, description = "Order cannot be confirmed"),
    ),
    tag = "Webhooks"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Ack>> {
    match state.config.payments.webhook_secret.as_deref() {
        Some(secret) => {
            let header = headers
                .get(SIGNATURE_HEADER)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| AppError::BadRequest("missing signature".into()))?;
            signature::verify(&body, header, secret, chrono::Utc::now().timestamp()).map_err(
                |err| {
                    tracing::warn!(error = %err, "rejected payment webhook");
                    AppError::BadRequest(err.to_string())
                },
            )?;
        }
        None => tracing::warn!("no webhook secret configured, signature not checked"),
    }

    let event: PaymentWebhookEvent = serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("invalid event: {err}")))?;

    let ack = webhook_service::handle_payment_event(&state, event).await?;
    Ok(Json(ack))
}
