//! The fulfillment worker: task-queue handlers for the warehouse, shipping and
//! delivery stages plus the notification dispatcher.

pub mod api_client;
pub mod error;
pub mod mailer;
pub mod notifications;
pub mod routes;
pub mod stages;
pub mod state;

pub use state::WorkerState;
