use crate::{
    events::{Notification, NotificationKind, NotificationRequestEvent},
    worker::{
        error::WorkerError,
        mailer::{Mailer, OutgoingEmail},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Pure function of the notification, so a redelivered task renders the same mail.
pub fn render(notification: &Notification) -> RenderedEmail {
    match notification {
        Notification::OrderConfirmed(event) => {
            let lines: Vec<String> = event
                .items
                .iter()
                .map(|item| {
                    format!(
                        "  {} x {} @ {}",
                        item.quantity,
                        item.product_name,
                        format_amount(item.unit_price)
                    )
                })
                .collect();
            RenderedEmail {
                subject: format!("Order {} confirmed", event.order_number),
                body: format!(
                    "Thanks for your order!\n\nOrder {} placed on {}.\n{}\n\nTotal: {}\n",
                    event.order_number,
                    event.order_date.format("%Y-%m-%d"),
                    lines.join("\n"),
                    format_amount(event.total_amount)
                ),
            }
        }
        Notification::OrderPacked(event) => RenderedEmail {
            subject: format!("Order {} is packed", event.order_number),
            body: format!(
                "Your order {} was packed on {} and will ship soon.\n",
                event.order_number,
                event.packed_at.format("%Y-%m-%d %H:%M UTC")
            ),
        },
        Notification::OrderShipped(event) => RenderedEmail {
            subject: format!("Order {} has shipped", event.order_number),
            body: format!(
                "Your order {} shipped on {}.\nTracking number: {}\nEstimated delivery: {}\n",
                event.order_number,
                event.shipped_at.format("%Y-%m-%d"),
                event.tracking_number,
                event.estimated_delivery_date.format("%A, %Y-%m-%d")
            ),
        },
        Notification::OrderDelivered(event) => RenderedEmail {
            subject: format!("Order {} delivered", event.order_number),
            body: format!(
                "Your order {} was delivered on {}. Enjoy!\n",
                event.order_number,
                event.delivered_at.format("%Y-%m-%d")
            ),
        },
    }
}

pub async fn dispatch_notification(
    mailer: &dyn Mailer,
    request: &NotificationRequestEvent,
) -> Result<NotificationKind, WorkerError> {
    let notification = Notification::decode(request)?;
    let rendered = render(&notification);
    mailer
        .send(&OutgoingEmail {
            to: request.user_email.clone(),
            subject: rendered.subject,
            body: rendered.body,
        })
        .await?;

    let kind = notification.kind();
    tracing::info!(%kind, to = %request.user_email, "notification sent");
    Ok(kind)
}

fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    format!("{sign}{}.{:02}", minor / 100, minor % 100)
}
