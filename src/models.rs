use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Order lifecycle. The fulfillment pipeline only ever moves an order one step
/// forward: `pending_payment -> confirmed -> processing -> shipped -> delivered`.
/// `cancelled` is reachable from `pending_payment` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (PendingPayment, Cancelled)
                | (Confirmed, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(OrderStatus::PendingPayment),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Address copied onto the order at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
    #[schema(value_type = Object)]
    pub shipping_address: serde_json::Value,
    #[schema(value_type = Object)]
    pub billing_address: serde_json::Value,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_cost: i64,
    pub discount: i64,
    pub total: i64,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub product_image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::orders::Model> for Order {
    fn from(model: crate::entity::orders::Model) -> Self {
        Order {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            status: model.status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            payment_intent_id: model.payment_intent_id,
            shipping_address: model.shipping_address,
            billing_address: model.billing_address,
            subtotal: model.subtotal,
            tax: model.tax,
            shipping_cost: model.shipping_cost,
            discount: model.discount,
            total: model.total,
            tracking_number: model.tracking_number,
            estimated_delivery_date: model
                .estimated_delivery_date
                .map(|dt| dt.with_timezone(&Utc)),
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::order_items::Model> for OrderItem {
    fn from(model: crate::entity::order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            product_sku: model.product_sku,
            product_image: model.product_image,
            unit_price: model.unit_price,
            quantity: model.quantity,
            total_price: model.total_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::cart_items::Model> for CartItem {
    fn from(model: crate::entity::cart_items::Model) -> Self {
        CartItem {
            id: model.id,
            cart_id: model.cart_id,
            product_id: model.product_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<crate::entity::addresses::Model> for AddressSnapshot {
    fn from(model: crate::entity::addresses::Model) -> Self {
        AddressSnapshot {
            full_name: model.full_name,
            line1: model.line1,
            line2: model.line2,
            city: model.city,
            region: model.region,
            postal_code: model.postal_code,
            country: model.country,
            phone: model.phone,
        }
    }
}
