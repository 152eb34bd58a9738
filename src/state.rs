use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    payments::PaymentGateway,
    tasks::TaskQueue,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub payments: Arc<dyn PaymentGateway>,
    pub tasks: Arc<dyn TaskQueue>,
    pub config: Arc<AppConfig>,
}
