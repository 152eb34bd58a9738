use order_fulfillment::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = serde_json::to_value(response.0.data.expect("health data")).unwrap();
    assert_eq!(data["status"], "ok");
    assert_eq!(data["service"], "api");
}

#[tokio::test]
async fn health_reports_crate_version() {
    let response = health_check().await;
    let data = serde_json::to_value(response.0.data.expect("health data")).unwrap();
    assert_eq!(data["version"], env!("CARGO_PKG_VERSION"));
}
