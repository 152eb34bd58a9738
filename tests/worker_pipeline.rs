mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use order_fulfillment::{
    dto::orders::UpdateOrderStatusRequest,
    events::{
        NOTIFICATION_REQUEST_PATH, NotificationRequestEvent, ORDER_CREATED_PATH,
        ORDER_PACKED_PATH, ORDER_SHIPPED_PATH, OrderCreatedEvent, OrderEventItem,
        OrderPackedEvent, OrderShippedEvent,
    },
    models::OrderStatus,
    worker::{
        api_client::OrderStatusClient,
        error::WorkerError,
        routes,
        stages::{self, add_business_days},
    },
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use common::{FakeOrderClient, RecordingMailer, RecordingQueue, WORKER_TOKEN, worker_harness};

fn created_event(order_id: i64) -> OrderCreatedEvent {
    OrderCreatedEvent {
        order_id,
        user_id: Uuid::new_v4(),
        order_number: format!("ORD-20250101-{order_id:08}"),
        user_email: "buyer@example.com".into(),
        total_amount: 2500,
        order_date: Utc::now(),
        items: vec![OrderEventItem {
            product_id: Uuid::new_v4(),
            product_name: "Widget".into(),
            quantity: 2,
            unit_price: 1000,
        }],
    }
}

fn packed_event(order_id: i64) -> OrderPackedEvent {
    OrderPackedEvent {
        order_id,
        order_number: format!("ORD-20250101-{order_id:08}"),
        user_id: Uuid::new_v4(),
        user_email: "buyer@example.com".into(),
        packed_at: Utc::now(),
    }
}

fn shipped_event(order_id: i64) -> OrderShippedEvent {
    OrderShippedEvent {
        order_id,
        order_number: format!("ORD-20250101-{order_id:08}"),
        user_id: Uuid::new_v4(),
        user_email: "buyer@example.com".into(),
        tracking_number: "TRK123".into(),
        shipped_at: Utc::now(),
        estimated_delivery_date: Utc::now(),
    }
}

#[tokio::test]
async fn warehouse_marks_processing_then_enqueues_packed_and_notification() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );

    let packed = stages::process_order_created(&h.state, created_event(100))
        .await
        .expect("warehouse stage");
    assert_eq!(packed.order_id, 100);

    let calls = h.orders.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 100);
    assert_eq!(calls[0].1.status, OrderStatus::Processing);

    let tasks = h.queue.tasks();
    assert_eq!(
        h.queue.paths(),
        vec![ORDER_PACKED_PATH.to_string(), NOTIFICATION_REQUEST_PATH.to_string()]
    );
    assert_eq!(tasks[0].1["order_id"], 100);
    assert_eq!(tasks[1].1["type"], "ORDER_PACKED");
    assert_eq!(tasks[1].1["user_email"], "buyer@example.com");
}

#[tokio::test]
async fn failed_status_callback_enqueues_nothing() {
    let h = worker_harness(
        FakeOrderClient::failing(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );

    let err = stages::process_order_created(&h.state, created_event(100))
        .await
        .expect_err("callback failure must abort the stage");
    assert!(matches!(err, WorkerError::Callback(_)));
    assert!(err.status_code().is_server_error());
    assert!(h.queue.tasks().is_empty());
}

#[tokio::test]
async fn next_stage_enqueue_failure_fails_the_stage() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::failing_on(&[ORDER_PACKED_PATH]),
        RecordingMailer::default(),
    );

    let err = stages::process_order_created(&h.state, created_event(7))
        .await
        .expect_err("next stage must be scheduled");
    assert!(matches!(err, WorkerError::Enqueue(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn notification_enqueue_failure_does_not_fail_the_stage() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::failing_on(&[NOTIFICATION_REQUEST_PATH]),
        RecordingMailer::default(),
    );

    stages::process_order_created(&h.state, created_event(8))
        .await
        .expect("notification is best effort");
    assert_eq!(h.queue.paths(), vec![ORDER_PACKED_PATH.to_string()]);
}

#[tokio::test]
async fn shipping_sets_tracking_and_estimate() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );

    let shipped = stages::process_order_packed(&h.state, packed_event(42))
        .await
        .expect("shipping stage");

    let calls = h.orders.calls();
    assert_eq!(calls.len(), 1);
    let update = &calls[0].1;
    assert_eq!(update.status, OrderStatus::Shipped);
    assert_eq!(update.tracking_number.as_deref(), Some(shipped.tracking_number.as_str()));
    assert_eq!(update.estimated_delivery_date, Some(shipped.estimated_delivery_date));
    assert!(shipped.estimated_delivery_date > shipped.shipped_at);

    let tasks = h.queue.tasks();
    assert_eq!(
        h.queue.paths(),
        vec![ORDER_SHIPPED_PATH.to_string(), NOTIFICATION_REQUEST_PATH.to_string()]
    );
    assert_eq!(tasks[0].1["tracking_number"], shipped.tracking_number.as_str());
    assert_eq!(tasks[1].1["type"], "ORDER_SHIPPED");
}

#[tokio::test]
async fn delivery_is_terminal() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );

    stages::process_order_shipped(&h.state, shipped_event(5))
        .await
        .expect("delivery stage");

    assert_eq!(h.orders.calls()[0].1.status, OrderStatus::Delivered);
    let tasks = h.queue.tasks();
    assert_eq!(tasks.len(), 1, "only the notification is enqueued");
    assert_eq!(tasks[0].0, NOTIFICATION_REQUEST_PATH);
    assert_eq!(tasks[0].1["type"], "ORDER_DELIVERED");
}

#[test]
fn business_days_skip_weekends() {
    // 2024-06-07 is a Friday.
    let friday: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 6, 7, 10, 0, 0).unwrap();
    assert_eq!(friday.weekday(), Weekday::Fri);

    let eta = add_business_days(friday, 3);
    assert_eq!(eta, Utc.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap());
    assert_eq!(eta.weekday(), Weekday::Wed);

    let saturday = Utc.with_ymd_and_hms(2024, 6, 8, 9, 0, 0).unwrap();
    assert_eq!(add_business_days(saturday, 1).weekday(), Weekday::Mon);
    assert_eq!(add_business_days(friday, 0), friday);
}

#[tokio::test]
async fn redelivered_packed_task_repeats_stored_tracking() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );

    let first = stages::process_order_packed(&h.state, packed_event(77))
        .await
        .expect("first delivery");
    let second = stages::process_order_packed(&h.state, packed_event(77))
        .await
        .expect("redelivery");

    assert!(first.tracking_number.starts_with("TRK"));
    assert_eq!(first.tracking_number.len(), 15);
    assert_eq!(second.tracking_number, first.tracking_number);
    assert_eq!(second.estimated_delivery_date, first.estimated_delivery_date);

    let stored = h.orders.stored(77).expect("stored order");
    assert_eq!(stored.tracking_number.as_deref(), Some(first.tracking_number.as_str()));

    let forwarded: Vec<Value> = h
        .queue
        .tasks()
        .into_iter()
        .filter(|(path, _)| path == ORDER_SHIPPED_PATH)
        .map(|(_, payload)| payload["tracking_number"].clone())
        .collect();
    assert_eq!(forwarded.len(), 2);
    assert!(forwarded.iter().all(|t| t == first.tracking_number.as_str()));

    let mailed: Vec<Value> = h
        .queue
        .tasks()
        .into_iter()
        .filter(|(_, payload)| payload["type"] == "ORDER_SHIPPED")
        .map(|(_, payload)| payload["payload"]["tracking_number"].clone())
        .collect();
    assert_eq!(mailed.len(), 2);
    assert!(mailed.iter().all(|t| t == first.tracking_number.as_str()));
}

#[tokio::test]
async fn shipped_order_without_tracking_fails_the_stage() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    // Status already `shipped` with nothing stored, e.g. set by hand.
    h.orders
        .update_status(9, &UpdateOrderStatusRequest::new(OrderStatus::Shipped))
        .await
        .expect("seed");

    let err = stages::process_order_packed(&h.state, packed_event(9))
        .await
        .expect_err("missing tracking");
    assert!(matches!(err, WorkerError::Callback(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.queue.tasks().is_empty());
}

async fn post(router: axum::Router, path: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = router
        .oneshot(request.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn handlers_require_worker_token() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let body = serde_json::to_value(created_event(1)).unwrap();

    let (status, _) = post(routes::router(h.state.clone()), ORDER_CREATED_PATH, None, &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        post(routes::router(h.state.clone()), ORDER_CREATED_PATH, Some("wrong"), &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.orders.calls().is_empty());
}

#[tokio::test]
async fn order_created_handler_runs_warehouse_stage() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let body = serde_json::to_value(created_event(100)).unwrap();

    let (status, json) =
        post(routes::router(h.state.clone()), ORDER_CREATED_PATH, Some(WORKER_TOKEN), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
    assert_eq!(h.orders.calls().len(), 1);
    assert_eq!(h.queue.tasks().len(), 2);
}

#[tokio::test]
async fn callback_failure_surfaces_as_server_error() {
    let h = worker_harness(
        FakeOrderClient::failing(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let body = serde_json::to_value(packed_event(3)).unwrap();

    let (status, _) =
        post(routes::router(h.state.clone()), ORDER_PACKED_PATH, Some(WORKER_TOKEN), &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.queue.tasks().is_empty());
}

#[tokio::test]
async fn notification_handler_sends_mail() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let request = NotificationRequestEvent {
        kind: "ORDER_PACKED".into(),
        user_email: "buyer@example.com".into(),
        payload: serde_json::to_value(packed_event(9)).unwrap(),
    };

    let (status, json) = post(
        routes::router(h.state.clone()),
        NOTIFICATION_REQUEST_PATH,
        Some(WORKER_TOKEN),
        &serde_json::to_value(&request).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detail"], "ORDER_PACKED");

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "buyer@example.com");
    assert!(sent[0].subject.contains("packed"));
}

#[tokio::test]
async fn unknown_notification_type_is_rejected_without_mail() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let request = serde_json::json!({
        "type": "ORDER_TELEPORTED",
        "user_email": "buyer@example.com",
        "payload": {}
    });

    let (status, json) = post(
        routes::router(h.state.clone()),
        NOTIFICATION_REQUEST_PATH,
        Some(WORKER_TOKEN),
        &request,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["message"].as_str().unwrap().contains("ORDER_TELEPORTED"));
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn worker_health_is_public() {
    let h = worker_harness(
        FakeOrderClient::default(),
        RecordingQueue::default(),
        RecordingMailer::default(),
    );
    let response = routes::router(h.state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
