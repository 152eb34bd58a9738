use std::sync::Arc;

use crate::{
    config::StageSettings,
    tasks::TaskQueue,
    worker::{api_client::OrderStatusClient, mailer::Mailer},
};

#[derive(Clone)]
pub struct WorkerState {
    pub orders: Arc<dyn OrderStatusClient>,
    pub tasks: Arc<dyn TaskQueue>,
    pub mailer: Arc<dyn Mailer>,
    pub stages: StageSettings,
    /// Bearer token the task queue presents on every delivery.
    pub auth_token: Arc<str>,
}
