use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    events::NotificationError,
    response::{ApiResponse, Meta},
    tasks::TaskError,
    worker::{api_client::CallbackError, mailer::MailError},
};

/// Failure of one task delivery. Anything mapped to 5xx is retried by the queue.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("status callback failed: {0}")]
    Callback(#[from] CallbackError),

    #[error("failed to enqueue next stage: {0}")]
    Enqueue(#[from] TaskError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),
}

impl WorkerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkerError::Unauthorized => StatusCode::UNAUTHORIZED,
            WorkerError::Notification(NotificationError::Encode(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WorkerError::Notification(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkerError::Mail(_) => StatusCode::BAD_GATEWAY,
            WorkerError::Callback(_) | WorkerError::Enqueue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "task failed");
        } else {
            tracing::warn!(error = %self, "task rejected");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}
