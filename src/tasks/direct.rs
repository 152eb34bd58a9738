use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{TaskError, TaskQueue};

const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Delivers tasks straight to the worker from a spawned tokio task, retrying with
/// exponential backoff up to `max_attempts`. Enqueue itself never blocks on delivery.
#[derive(Clone)]
pub struct DirectTaskQueue {
    http: reqwest::Client,
    worker_base_url: String,
    worker_token: String,
    max_attempts: u32,
}

impl DirectTaskQueue {
    pub fn new(
        http: reqwest::Client,
        worker_base_url: String,
        worker_token: String,
        max_attempts: u32,
    ) -> Self {
        Self {
            http,
            worker_base_url,
            worker_token,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn deliver(self, url: String, body: Vec<u8>) {
        for attempt in 1..=self.max_attempts {
            let result = self
                .http
                .post(&url)
                .bearer_auth(&self.worker_token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, attempt, "task delivered");
                    return;
                }
                Ok(response) => {
                    tracing::warn!(url = %url, attempt, status = %response.status(), "task delivery rejected");
                }
                Err(err) => {
                    tracing::warn!(url = %url, attempt, error = %err, "task delivery failed");
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(BASE_BACKOFF * 2u32.pow((attempt - 1).min(6))).await;
            }
        }

        tracing::error!(url = %url, attempts = self.max_attempts, "task dropped after retries");
    }
}

#[async_trait]
impl TaskQueue for DirectTaskQueue {
    async fn enqueue(&self, handler_path: &str, payload: Value) -> Result<(), TaskError> {
        let body = serde_json::to_vec(&payload)?;
        let url = format!("{}{}", self.worker_base_url, handler_path);
        tokio::spawn(self.clone().deliver(url, body));
        Ok(())
    }
}
