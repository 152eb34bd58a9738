//! Wire payloads exchanged between the API and the fulfillment worker.
//!
//! Field names are part of the task-queue contract and must stay stable.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::tasks::{TaskError, TaskQueue};

pub const ORDER_CREATED_PATH: &str = "/handle/order-created";
pub const ORDER_PACKED_PATH: &str = "/handle/order-packed";
pub const ORDER_SHIPPED_PATH: &str = "/handle/order-shipped";
pub const NOTIFICATION_REQUEST_PATH: &str = "/handle/notification-request";

/// A payload with a dedicated worker handler.
pub trait FulfillmentTask: Serialize {
    const HANDLER_PATH: &'static str;
}

pub async fn enqueue_task<T>(queue: &dyn TaskQueue, task: &T) -> Result<(), TaskError>
where
    T: FulfillmentTask + Sync,
{
    let payload = serde_json::to_value(task)?;
    queue.enqueue(T::HANDLER_PATH, payload).await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: i64,
    pub user_id: Uuid,
    pub order_number: String,
    pub user_email: String,
    pub total_amount: i64,
    pub order_date: DateTime<Utc>,
    pub items: Vec<OrderEventItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPackedEvent {
    pub order_id: i64,
    pub order_number: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub packed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippedEvent {
    pub order_id: i64,
    pub order_number: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub tracking_number: String,
    pub shipped_at: DateTime<Utc>,
    pub estimated_delivery_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order_id: i64,
    pub order_number: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub delivered_at: DateTime<Utc>,
}

/// Notification as it travels on the queue: a type tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequestEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_email: String,
    pub payload: Value,
}

impl FulfillmentTask for OrderCreatedEvent {
    const HANDLER_PATH: &'static str = ORDER_CREATED_PATH;
}

impl FulfillmentTask for OrderPackedEvent {
    const HANDLER_PATH: &'static str = ORDER_PACKED_PATH;
}

impl FulfillmentTask for OrderShippedEvent {
    const HANDLER_PATH: &'static str = ORDER_SHIPPED_PATH;
}

impl FulfillmentTask for NotificationRequestEvent {
    const HANDLER_PATH: &'static str = NOTIFICATION_REQUEST_PATH;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderConfirmed,
    OrderPacked,
    OrderShipped,
    OrderDelivered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmed => "ORDER_CONFIRMED",
            NotificationKind::OrderPacked => "ORDER_PACKED",
            NotificationKind::OrderShipped => "ORDER_SHIPPED",
            NotificationKind::OrderDelivered => "ORDER_DELIVERED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_CONFIRMED" => Ok(NotificationKind::OrderConfirmed),
            "ORDER_PACKED" => Ok(NotificationKind::OrderPacked),
            "ORDER_SHIPPED" => Ok(NotificationKind::OrderShipped),
            "ORDER_DELIVERED" => Ok(NotificationKind::OrderDelivered),
            other => Err(NotificationError::UnhandledType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("unhandled notification type `{0}`")]
    UnhandledType(String),

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: NotificationKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode notification payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Decoded notification, one variant per known type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    OrderConfirmed(OrderCreatedEvent),
    OrderPacked(OrderPackedEvent),
    OrderShipped(OrderShippedEvent),
    OrderDelivered(OrderDeliveredEvent),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::OrderConfirmed(_) => NotificationKind::OrderConfirmed,
            Notification::OrderPacked(_) => NotificationKind::OrderPacked,
            Notification::OrderShipped(_) => NotificationKind::OrderShipped,
            Notification::OrderDelivered(_) => NotificationKind::OrderDelivered,
        }
    }

    pub fn user_email(&self) -> &str {
        match self {
            Notification::OrderConfirmed(e) => &e.user_email,
            Notification::OrderPacked(e) => &e.user_email,
            Notification::OrderShipped(e) => &e.user_email,
            Notification::OrderDelivered(e) => &e.user_email,
        }
    }

    pub fn to_request(&self) -> Result<NotificationRequestEvent, NotificationError> {
        let payload = match self {
            Notification::OrderConfirmed(e) => serde_json::to_value(e)?,
            Notification::OrderPacked(e) => serde_json::to_value(e)?,
            Notification::OrderShipped(e) => serde_json::to_value(e)?,
            Notification::OrderDelivered(e) => serde_json::to_value(e)?,
        };
        Ok(NotificationRequestEvent {
            kind: self.kind().as_str().to_string(),
            user_email: self.user_email().to_string(),
            payload,
        })
    }

    pub fn decode(request: &NotificationRequestEvent) -> Result<Self, NotificationError> {
        let kind: NotificationKind = request.kind.parse()?;
        let notification = match kind {
            NotificationKind::OrderConfirmed => {
                Notification::OrderConfirmed(decode_payload(kind, &request.payload)?)
            }
            NotificationKind::OrderPacked => {
                Notification::OrderPacked(decode_payload(kind, &request.payload)?)
            }
            NotificationKind::OrderShipped => {
                Notification::OrderShipped(decode_payload(kind, &request.payload)?)
            }
            NotificationKind::OrderDelivered => {
                Notification::OrderDelivered(decode_payload(kind, &request.payload)?)
            }
        };
        Ok(notification)
    }
}

fn decode_payload<T: DeserializeOwned>(
    kind: NotificationKind,
    payload: &Value,
) -> Result<T, NotificationError> {
    T::deserialize(payload).map_err(|source| NotificationError::InvalidPayload { kind, source })
}
