//! Fulfillment task creator.
//!
//! A task is an HTTP POST against the worker (`worker_base_url + handler_path`) with a
//! JSON body, delivered at least once by the backing queue. Retry policy belongs to the
//! queue, never to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{TaskBackend, TaskQueueConfig};

pub mod cloud_tasks;
pub mod direct;

pub use cloud_tasks::CloudTasksQueue;
pub use direct::DirectTaskQueue;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to encode task payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task queue request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("task queue rejected task ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Schedule one delivery of `payload` to the worker handler at `handler_path`.
    async fn enqueue(&self, handler_path: &str, payload: Value) -> Result<(), TaskError>;
}

pub fn from_config(config: &TaskQueueConfig, http: reqwest::Client) -> Arc<dyn TaskQueue> {
    match &config.backend {
        TaskBackend::Direct { max_attempts } => Arc::new(DirectTaskQueue::new(
            http,
            config.worker_base_url.clone(),
            config.auth_token.clone(),
            *max_attempts,
        )),
        TaskBackend::CloudTasks {
            project,
            location,
            queue,
            access_token,
        } => Arc::new(CloudTasksQueue::new(
            http,
            format!("projects/{project}/locations/{location}/queues/{queue}"),
            access_token.clone(),
            config.worker_base_url.clone(),
            config.auth_token.clone(),
        )),
    }
}
