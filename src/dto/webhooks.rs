use serde::Deserialize;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// The subset of a gateway event this service reads.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: PaymentWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
}
