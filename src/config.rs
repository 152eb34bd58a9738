use std::{env, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payments: PaymentConfig,
    pub internal_api_token: String,
    pub tasks: TaskQueueConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            payments: PaymentConfig::from_env()?,
            internal_api_token: env::var("INTERNAL_API_TOKEN")
                .context("INTERNAL_API_TOKEN is not set")?,
            tasks: TaskQueueConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    Mock,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub provider: PaymentProvider,
    pub currency: String,
    pub stripe_secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl PaymentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = match env::var("PAYMENT_PROVIDER").as_deref() {
            Ok("stripe") => PaymentProvider::Stripe,
            Ok("mock") | Err(_) => PaymentProvider::Mock,
            Ok(other) => anyhow::bail!("unsupported PAYMENT_PROVIDER `{other}`"),
        };
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();
        if provider == PaymentProvider::Stripe {
            anyhow::ensure!(
                stripe_secret_key.is_some() && webhook_secret.is_some(),
                "STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET are required for the stripe provider"
            );
        }
        Ok(Self {
            provider,
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            stripe_secret_key,
            webhook_secret,
        })
    }
}

/// Where fulfillment tasks are scheduled. Both backends deliver a POST with a JSON body
/// to `worker_base_url + handler path`, carrying `Authorization: Bearer <auth_token>`.
#[derive(Debug, Clone)]
pub struct TaskQueueConfig {
    pub worker_base_url: String,
    pub auth_token: String,
    pub backend: TaskBackend,
}

#[derive(Debug, Clone)]
pub enum TaskBackend {
    /// In-process delivery with bounded retries, for local runs.
    Direct { max_attempts: u32 },
    CloudTasks {
        project: String,
        location: String,
        queue: String,
        access_token: String,
    },
}

impl TaskQueueConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let worker_base_url =
            env::var("WORKER_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string());
        let auth_token = env::var("WORKER_AUTH_TOKEN").context("WORKER_AUTH_TOKEN is not set")?;
        let backend = match env::var("TASK_QUEUE_BACKEND").as_deref() {
            Ok("cloud_tasks") => TaskBackend::CloudTasks {
                project: env::var("CLOUD_TASKS_PROJECT")?,
                location: env::var("CLOUD_TASKS_LOCATION")?,
                queue: env::var("CLOUD_TASKS_QUEUE")?,
                access_token: env::var("CLOUD_TASKS_ACCESS_TOKEN")?,
            },
            Ok("direct") | Err(_) => TaskBackend::Direct {
                max_attempts: env::var("TASK_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(5),
            },
            Ok(other) => anyhow::bail!("unsupported TASK_QUEUE_BACKEND `{other}`"),
        };
        Ok(Self {
            worker_base_url: worker_base_url.trim_end_matches('/').to_string(),
            auth_token,
            backend,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub api_base_url: String,
    pub internal_api_token: String,
    pub stages: StageSettings,
    pub mail: MailConfig,
    pub tasks: TaskQueueConfig,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("WORKER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("WORKER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3001);
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        Ok(Self {
            host,
            port,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            internal_api_token: env::var("INTERNAL_API_TOKEN")
                .context("INTERNAL_API_TOKEN is not set")?,
            stages: StageSettings::from_env(),
            mail: MailConfig::from_env()?,
            tasks: TaskQueueConfig::from_env()?,
        })
    }
}

/// Simulated handling time per stage and the carrier's delivery estimate.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub warehouse_delay: Duration,
    pub shipping_delay: Duration,
    pub delivery_delay: Duration,
    pub delivery_business_days: u32,
}

impl StageSettings {
    pub fn from_env() -> Self {
        Self {
            warehouse_delay: millis_from_env("WAREHOUSE_DELAY_MS", 2000),
            shipping_delay: millis_from_env("SHIPPING_DELAY_MS", 3000),
            delivery_delay: millis_from_env("DELIVERY_DELAY_MS", 5000),
            delivery_business_days: env::var("DELIVERY_BUSINESS_DAYS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(3),
        }
    }

    /// No delays; used by tests.
    pub fn immediate(delivery_business_days: u32) -> Self {
        Self {
            warehouse_delay: Duration::ZERO,
            shipping_delay: Duration::ZERO,
            delivery_delay: Duration::ZERO,
            delivery_business_days,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MailConfig {
    Log { from: String },
    SendGrid { api_key: String, from: String },
}

impl MailConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let from = env::var("MAIL_FROM").unwrap_or_else(|_| "orders@example.com".to_string());
        match env::var("MAIL_PROVIDER").as_deref() {
            Ok("sendgrid") => Ok(MailConfig::SendGrid {
                api_key: env::var("SENDGRID_API_KEY").context("SENDGRID_API_KEY is not set")?,
                from,
            }),
            Ok("log") | Err(_) => Ok(MailConfig::Log { from }),
            Ok(other) => anyhow::bail!("unsupported MAIL_PROVIDER `{other}`"),
        }
    }
}

fn millis_from_env(key: &str, default: u64) -> Duration {
    let ms = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_millis(ms)
}
