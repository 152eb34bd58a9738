use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub shipping_address_id: Uuid,
    /// Defaults to the shipping address.
    pub billing_address_id: Option<Uuid>,
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub order_number: String,
    pub client_secret: String,
}

/// Body of `POST /internal/orders/{id}/status`, sent by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
}

impl UpdateOrderStatusRequest {
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status,
            payment_status: None,
            tracking_number: None,
            estimated_delivery_date: None,
        }
    }
}

/// Order state as stored after a status callback. The worker builds its next events
/// from these values, so a redelivered task repeats what was saved the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusReceipt {
    pub order_id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
