use axum::http::StatusCode;
use order_fulfillment::{
    error::AppError,
    models::{OrderStatus, PaymentStatus},
};
use uuid::Uuid;

const LIFECYCLE: [OrderStatus; 5] = [
    OrderStatus::PendingPayment,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

const ALL: [OrderStatus; 6] = [
    OrderStatus::PendingPayment,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

#[test]
fn lifecycle_only_moves_one_step_forward() {
    for (i, from) in LIFECYCLE.iter().enumerate() {
        for (j, to) in LIFECYCLE.iter().enumerate() {
            assert_eq!(
                from.can_transition_to(*to),
                j == i + 1,
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn only_unpaid_orders_can_be_cancelled() {
    for status in ALL {
        assert_eq!(
            status.can_transition_to(OrderStatus::Cancelled),
            status == OrderStatus::PendingPayment,
            "{status} -> cancelled"
        );
        assert!(!OrderStatus::Cancelled.can_transition_to(status));
        assert!(!OrderStatus::Delivered.can_transition_to(status));
    }
}

#[test]
fn statuses_use_snake_case_on_the_wire() {
    for status in ALL {
        let wire = serde_json::to_value(status).unwrap();
        assert_eq!(wire, status.as_str());
        assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
    }
    assert!("packed".parse::<OrderStatus>().is_err());
    assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
}

#[test]
fn error_status_codes() {
    let stock = AppError::InsufficientStock {
        product_id: Uuid::new_v4(),
        available: 2,
        requested: 3,
    };
    assert_eq!(stock.status_code(), StatusCode::CONFLICT);
    assert!(stock.to_string().contains("available 2, requested 3"));

    let transition = AppError::InvalidTransition {
        from: OrderStatus::PendingPayment,
        to: OrderStatus::Processing,
    };
    assert_eq!(transition.status_code(), StatusCode::CONFLICT);

    assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::OrderNotFound("pi_x".into()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AppError::PaymentGateway("declined".into()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
