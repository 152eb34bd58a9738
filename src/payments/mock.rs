use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};

/// Gateway that never leaves the process. Intents come back as `requires_payment_method`.
#[derive(Debug, Default, Clone)]
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    #[instrument(skip(self), fields(order_number = request.order_number, amount = request.amount))]
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidAmount(request.amount));
        }

        let id = format!("pi_mock_{}", Uuid::new_v4().simple());
        info!(payment_intent_id = %id, "created mock payment intent");
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret_{}", Uuid::new_v4().simple()),
            id,
            amount: request.amount,
            currency: request.currency.to_string(),
            status: "requires_payment_method".to_string(),
        })
    }
}
