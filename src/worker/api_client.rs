//! The worker's only way to change an order: a synchronous call to the API's
//! internal status endpoint. Retries belong to the task queue, not to this client.

use async_trait::async_trait;
use thiserror::Error;

use crate::dto::orders::{OrderStatusReceipt, UpdateOrderStatusRequest};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("order API unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("order API answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("order {order_id} is {status} but has no {field}")]
    Incomplete {
        order_id: i64,
        status: String,
        field: &'static str,
    },
}

#[async_trait]
pub trait OrderStatusClient: Send + Sync {
    async fn update_status(
        &self,
        order_id: i64,
        update: &UpdateOrderStatusRequest,
    ) -> Result<OrderStatusReceipt, CallbackError>;
}

pub struct HttpOrderStatusClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpOrderStatusClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl OrderStatusClient for HttpOrderStatusClient {
    async fn update_status(
        &self,
        order_id: i64,
        update: &UpdateOrderStatusRequest,
    ) -> Result<OrderStatusReceipt, CallbackError> {
        let url = format!("{}/internal/orders/{order_id}/status", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(update)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallbackError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
