use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use std::{net::SocketAddr, sync::Arc};

use order_fulfillment::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    payments,
    response::{ApiResponse, Meta},
    routes::{create_api_router, doc::scalar_docs, health},
    state::AppState,
    tasks, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&config.database_url).await?;

    run_migrations(&orm).await?;

    let http = reqwest::Client::new();
    let state = AppState {
        pool,
        orm,
        payments: payments::from_config(&config.payments, http.clone()),
        tasks: tasks::from_config(&config.tasks, http),
        config: Arc::new(config.clone()),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .merge(create_api_router())
        .fallback(not_found)
        .with_state(state)
        .merge(scalar_docs());
    let app = telemetry::with_http_layers(app, 100);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
