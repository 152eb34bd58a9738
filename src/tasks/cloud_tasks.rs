use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use super::{TaskError, TaskQueue};

const CLOUD_TASKS_API: &str = "https://cloudtasks.googleapis.com/v2";

/// Google Cloud Tasks HTTP-target queue. Retry and backoff come from the queue's
/// own configuration.
pub struct CloudTasksQueue {
    http: reqwest::Client,
    parent: String,
    access_token: String,
    worker_base_url: String,
    worker_token: String,
}

impl CloudTasksQueue {
    pub fn new(
        http: reqwest::Client,
        parent: String,
        access_token: String,
        worker_base_url: String,
        worker_token: String,
    ) -> Self {
        Self {
            http,
            parent,
            access_token,
            worker_base_url,
            worker_token,
        }
    }

    fn task_body(&self, handler_path: &str, payload: &Value) -> Result<Value, TaskError> {
        let body = serde_json::to_vec(payload)?;
        Ok(json!({
            "task": {
                "httpRequest": {
                    "httpMethod": "POST",
                    "url": format!("{}{}", self.worker_base_url, handler_path),
                    "headers": {
                        "Content-Type": "application/json",
                        "Authorization": format!("Bearer {}", self.worker_token),
                    },
                    "body": STANDARD.encode(body),
                }
            }
        }))
    }
}

#[async_trait]
impl TaskQueue for CloudTasksQueue {
    async fn enqueue(&self, handler_path: &str, payload: Value) -> Result<(), TaskError> {
        let body = self.task_body(handler_path, &payload)?;
        let response = self
            .http
            .post(format!("{}/{}/tasks", CLOUD_TASKS_API, self.parent))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TaskError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(handler = handler_path, "task created");
        Ok(())
    }
}
