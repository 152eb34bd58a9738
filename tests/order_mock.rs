//! Transactional paths exercised against SeaORM's mock connection.

mod common;

use std::sync::atomic::Ordering;

use chrono::Utc;
use order_fulfillment::{
    dto::orders::{CreateOrderRequest, UpdateOrderStatusRequest},
    entity::{addresses, cart_items, orders, products},
    error::AppError,
    models::OrderStatus,
    payments::MockPaymentGateway,
    services::{
        order_service::{apply_status_update, place_order},
        webhook_service::{PaymentOutcome, confirm_payment},
    },
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use uuid::Uuid;

use common::FailingGateway;

fn request(shipping_address_id: Uuid) -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address_id,
        billing_address_id: None,
        payment_method: "card".into(),
    }
}

fn cart_line(cart_id: Uuid, product_id: Uuid, quantity: i32) -> cart_items::Model {
    cart_items::Model {
        id: Uuid::new_v4(),
        cart_id,
        product_id,
        quantity,
        created_at: Utc::now().into(),
    }
}

fn product(id: Uuid, price: i64, stock: i32) -> products::Model {
    products::Model {
        id,
        name: "Widget".into(),
        sku: format!("SKU-{}", id.simple()),
        image_url: None,
        price,
        stock,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn address(user_id: Uuid) -> addresses::Model {
    addresses::Model {
        id: Uuid::new_v4(),
        user_id,
        full_name: "Ada Buyer".into(),
        line1: "1 Main St".into(),
        line2: None,
        city: "Springfield".into(),
        region: None,
        postal_code: "12345".into(),
        country: "US".into(),
        phone: None,
        created_at: Utc::now().into(),
    }
}

fn order(status: OrderStatus, payment_status: &str) -> orders::Model {
    orders::Model {
        id: 100,
        order_number: "ORD-20240607-ABCDEF12".into(),
        user_id: Uuid::new_v4(),
        status: status.as_str().into(),
        payment_status: payment_status.into(),
        payment_method: "card".into(),
        payment_intent_id: Some("pi_123".into()),
        shipping_address: serde_json::json!({}),
        billing_address: serde_json::json!({}),
        subtotal: 2500,
        tax: 0,
        shipping_cost: 0,
        discount: 0,
        total: 2500,
        tracking_number: None,
        estimated_delivery_date: None,
        paid_at: None,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

/// Every statement the mock saw, with Debug quoting undone.
fn transaction_log(db: DatabaseConnection) -> String {
    format!("{:?}", db.into_transaction_log()).replace("\\\"", "\"")
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<cart_items::Model>::new()])
        .into_connection();

    let err = place_order(
        &db,
        &MockPaymentGateway,
        "usd",
        Uuid::new_v4(),
        Uuid::new_v4(),
        &request(Uuid::new_v4()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
}

#[tokio::test]
async fn blank_payment_method_is_rejected_before_touching_the_store() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let mut req = request(Uuid::new_v4());
    req.payment_method = "  ".into();

    let err = place_order(&db, &MockPaymentGateway, "usd", Uuid::new_v4(), Uuid::new_v4(), &req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn insufficient_stock_names_product_and_quantities() {
    let cart_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let gateway = common::CountingGateway::default();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cart_line(cart_id, product_id, 3)]])
        .append_query_results([vec![product(product_id, 1000, 2)]])
        .into_connection();

    let err = place_order(&db, &gateway, "usd", Uuid::new_v4(), cart_id, &request(Uuid::new_v4()))
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientStock {
            product_id: offending,
            available,
            requested,
        } => {
            assert_eq!(offending, product_id);
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

    assert!(!transaction_log(db).contains("INSERT INTO"));
}

#[tokio::test]
async fn gateway_failure_writes_nothing() {
    let user_id = Uuid::new_v4();
    let cart_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let shipping = address(user_id);
    let gateway = FailingGateway::default();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cart_line(cart_id, product_id, 2)]])
        .append_query_results([vec![product(product_id, 1000, 5)]])
        .append_query_results([vec![shipping.clone()]])
        .into_connection();

    let err = place_order(&db, &gateway, "usd", user_id, cart_id, &request(shipping.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentGateway(_)));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

    let log = transaction_log(db);
    assert!(!log.contains("INSERT INTO"));
    assert!(!log.contains("UPDATE \"products\""));
    assert!(!log.contains("DELETE FROM"));
}

#[tokio::test]
async fn unknown_shipping_address_is_a_bad_request() {
    let cart_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let gateway = common::CountingGateway::default();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cart_line(cart_id, product_id, 1)]])
        .append_query_results([vec![product(product_id, 1000, 5)]])
        .append_query_results([Vec::<addresses::Model>::new()])
        .into_connection();

    let err = place_order(&db, &gateway, "usd", Uuid::new_v4(), cart_id, &request(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn webhook_for_unknown_intent_is_order_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<orders::Model>::new()])
        .into_connection();

    let err = confirm_payment(&db, "pi_missing").await.unwrap_err();
    assert!(matches!(err, AppError::OrderNotFound(ref id) if id == "pi_missing"));
}

#[tokio::test]
async fn duplicate_webhook_changes_nothing() {
    let paid = order(OrderStatus::Confirmed, "paid");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![paid.clone()]])
        .into_connection();

    let outcome = confirm_payment(&db, "pi_123").await.unwrap();
    assert!(matches!(outcome, PaymentOutcome::AlreadyPaid(ref o) if o == &paid));
    assert!(!transaction_log(db).contains("UPDATE \"orders\""));
}

#[tokio::test]
async fn first_webhook_confirms_and_marks_paid() {
    let pending = order(OrderStatus::PendingPayment, "pending");
    let mut confirmed = pending.clone();
    confirmed.status = "confirmed".into();
    confirmed.payment_status = "paid".into();
    confirmed.paid_at = Some(Utc::now().into());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![pending], vec![confirmed]])
        .into_connection();

    let outcome = confirm_payment(&db, "pi_123").await.unwrap();
    let PaymentOutcome::Confirmed(order) = outcome else {
        panic!("expected a confirmation");
    };
    assert_eq!(order.status, "confirmed");
    assert_eq!(order.payment_status, "paid");
}

#[tokio::test]
async fn webhook_cannot_revive_cancelled_order() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![order(OrderStatus::Cancelled, "failed")]])
        .into_connection();

    let err = confirm_payment(&db, "pi_123").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Confirmed
        }
    ));
}

#[tokio::test]
async fn status_update_cannot_skip_a_stage() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![order(OrderStatus::PendingPayment, "pending")]])
        .into_connection();

    let err = apply_status_update(&db, 100, UpdateOrderStatusRequest::new(OrderStatus::Processing))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn repeated_status_update_is_a_no_op() {
    let mut shipped = order(OrderStatus::Shipped, "paid");
    shipped.tracking_number = Some("TRKFIRST".into());
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![shipped.clone()]])
        .into_connection();

    let mut update = UpdateOrderStatusRequest::new(OrderStatus::Shipped);
    update.tracking_number = Some("TRKSECOND".into());
    let order = apply_status_update(&db, 100, update).await.unwrap();
    assert_eq!(order.tracking_number.as_deref(), Some("TRKFIRST"));
    assert!(!transaction_log(db).contains("UPDATE \"orders\""));
}

#[tokio::test]
async fn missing_order_status_update_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<orders::Model>::new()])
        .into_connection();

    let err = apply_status_update(&db, 404, UpdateOrderStatusRequest::new(OrderStatus::Shipped))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
