use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::response::{ApiResponse, Meta};

/// Liveness only; neither process probes the database or the queue here.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub fn report(service: &'static str) -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok",
        service,
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(ApiResponse::success("Health check", data, Some(Meta::empty())))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "API process is up", body = ApiResponse<HealthData>)),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    report("api")
}
