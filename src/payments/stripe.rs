use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Self {
            http,
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self), fields(order_number = request.order_number, amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidAmount(request.amount));
        }

        let amount = request.amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[order_number]", request.order_number),
        ];

        let response = self
            .http
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", request.order_number)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorBody>().await {
                Ok(body) => body.error.message.unwrap_or_default(),
                Err(_) => String::new(),
            };
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: StripeIntent = response.json().await?;
        Ok(PaymentIntent {
            client_secret: intent.client_secret.unwrap_or_default(),
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }
}
