#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use order_fulfillment::{
    config::StageSettings,
    dto::orders::{OrderStatusReceipt, UpdateOrderStatusRequest},
    payments::{
        MockPaymentGateway, PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest,
    },
    tasks::{TaskError, TaskQueue},
    worker::{
        WorkerState,
        api_client::{CallbackError, OrderStatusClient},
        mailer::{MailError, Mailer, OutgoingEmail},
    },
};
use serde_json::Value;

pub const WORKER_TOKEN: &str = "worker-test-token";

/// Records every enqueued task; paths listed in `failing` are rejected.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<(String, Value)>>,
    failing: Vec<String>,
}

impl RecordingQueue {
    pub fn failing_on(paths: &[&str]) -> Self {
        Self {
            tasks: Mutex::default(),
            failing: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn tasks(&self) -> Vec<(String, Value)> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.tasks().into_iter().map(|(path, _)| path).collect()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, handler_path: &str, payload: Value) -> Result<(), TaskError> {
        if self.failing.iter().any(|p| p == handler_path) {
            return Err(TaskError::Rejected {
                status: 503,
                body: "queue unavailable".into(),
            });
        }
        self.tasks
            .lock()
            .unwrap()
            .push((handler_path.to_string(), payload));
        Ok(())
    }
}

/// Stands in for the internal status endpoint. Like the API, re-sending the current
/// status keeps the values stored the first time.
#[derive(Default)]
pub struct FakeOrderClient {
    calls: Mutex<Vec<(i64, UpdateOrderStatusRequest)>>,
    stored: Mutex<HashMap<i64, OrderStatusReceipt>>,
    pub fail: bool,
}

impl FakeOrderClient {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(i64, UpdateOrderStatusRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored(&self, order_id: i64) -> Option<OrderStatusReceipt> {
        self.stored.lock().unwrap().get(&order_id).cloned()
    }
}

#[async_trait]
impl OrderStatusClient for FakeOrderClient {
    async fn update_status(
        &self,
        order_id: i64,
        update: &UpdateOrderStatusRequest,
    ) -> Result<OrderStatusReceipt, CallbackError> {
        self.calls.lock().unwrap().push((order_id, update.clone()));
        if self.fail {
            return Err(CallbackError::Rejected {
                status: 500,
                body: "boom".into(),
            });
        }

        let mut stored = self.stored.lock().unwrap();
        let already_applied = stored
            .get(&order_id)
            .is_some_and(|receipt| receipt.status == update.status);
        let receipt = stored.entry(order_id).or_insert_with(|| OrderStatusReceipt {
            order_id,
            status: update.status,
            tracking_number: None,
            estimated_delivery_date: None,
        });
        if !already_applied {
            receipt.status = update.status;
            if let Some(tracking_number) = &update.tracking_number {
                receipt.tracking_number = Some(tracking_number.clone());
            }
            if let Some(eta) = update.estimated_delivery_date {
                receipt.estimated_delivery_date = Some(eta);
            }
        }
        Ok(receipt.clone())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected {
                status: 503,
                body: "try later".into(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Always refuses to create an intent, after counting the attempt.
#[derive(Default)]
pub struct FailingGateway {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_payment_intent(
        &self,
        _request: PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PaymentError::Rejected {
            status: 402,
            message: "card_declined".into(),
        })
    }
}

/// Mock gateway that also counts calls.
#[derive(Default)]
pub struct CountingGateway {
    pub calls: AtomicUsize,
    inner: MockPaymentGateway,
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_payment_intent(request).await
    }
}

pub struct WorkerHarness {
    pub orders: Arc<FakeOrderClient>,
    pub queue: Arc<RecordingQueue>,
    pub mailer: Arc<RecordingMailer>,
    pub state: WorkerState,
}

pub fn worker_harness(
    orders: FakeOrderClient,
    queue: RecordingQueue,
    mailer: RecordingMailer,
) -> WorkerHarness {
    let orders = Arc::new(orders);
    let queue = Arc::new(queue);
    let mailer = Arc::new(mailer);
    let state = WorkerState {
        orders: orders.clone(),
        tasks: queue.clone(),
        mailer: mailer.clone(),
        stages: StageSettings::immediate(3),
        auth_token: Arc::from(WORKER_TOKEN),
    };
    WorkerHarness {
        orders,
        queue,
        mailer,
        state,
    }
}
