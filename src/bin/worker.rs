use std::{net::SocketAddr, sync::Arc};

use order_fulfillment::{
    config::WorkerConfig,
    tasks, telemetry,
    worker::{WorkerState, api_client::HttpOrderStatusClient, mailer, routes},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = WorkerConfig::from_env()?;
    let http = reqwest::Client::new();

    let state = WorkerState {
        orders: Arc::new(HttpOrderStatusClient::new(
            http.clone(),
            config.api_base_url.clone(),
            config.internal_api_token.clone(),
        )),
        tasks: tasks::from_config(&config.tasks, http.clone()),
        mailer: mailer::from_config(&config.mail, http),
        stages: config.stages.clone(),
        auth_token: Arc::from(config.tasks.auth_token.as_str()),
    };

    let app = telemetry::with_http_layers(routes::router(state), 64);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!(api = %config.api_base_url, "worker listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
