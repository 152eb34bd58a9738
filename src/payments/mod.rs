//! Payment gateway adapters.
//!
//! The gateway client is built once at startup and shared through the app state;
//! the order orchestrator only sees the [`PaymentGateway`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{PaymentConfig, PaymentProvider};

pub mod mock;
pub mod signature;
pub mod stripe;

pub use mock::MockPaymentGateway;
pub use stripe::StripeGateway;

/// The gateway's view of an authorized-but-unconfirmed payment. Orders keep only `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PaymentIntentRequest<'a> {
    /// Minor currency units.
    pub amount: i64,
    pub currency: &'a str,
    /// Also used as the idempotency key.
    pub order_number: &'a str,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(i64),

    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError>;
}

pub fn from_config(config: &PaymentConfig, http: reqwest::Client) -> Arc<dyn PaymentGateway> {
    match (&config.provider, &config.stripe_secret_key) {
        (PaymentProvider::Stripe, Some(secret_key)) => {
            Arc::new(StripeGateway::new(http, secret_key.clone()))
        }
        _ => {
            tracing::warn!("using mock payment gateway");
            Arc::new(MockPaymentGateway::default())
        }
    }
}
