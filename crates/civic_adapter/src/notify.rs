#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AccountRequestSubmitted,
    AccountRequestApproved,
    AccountRequestRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl NotifyOutcome {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outbound message sink. Delivery outcome never affects the operation that
/// raised the notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> NotifyOutcome;
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> NotifyOutcome {
        info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification"
        );
        NotifyOutcome::delivered()
    }
}

/// POSTs each notification as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(WEBHOOK_TIMEOUT)
            .timeout_read(WEBHOOK_TIMEOUT)
            .timeout_write(WEBHOOK_TIMEOUT)
            .user_agent("civic_adapter/0.1")
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, notification: &Notification) -> NotifyOutcome {
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(notification);
        match result {
            Ok(_) => NotifyOutcome::delivered(),
            Err(ureq::Error::Status(status, _)) => {
                NotifyOutcome::failed(format!("webhook answered http {status}"))
            }
            Err(ureq::Error::Transport(transport)) => {
                NotifyOutcome::failed(format!("webhook transport failure: {transport}"))
            }
        }
    }
}

fn report(notification: &Notification, outcome: NotifyOutcome) {
    if !outcome.success {
        warn!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "notification delivery failed"
        );
    }
}

/// Fire-and-forget delivery. Inside a tokio runtime the notifier runs on the
/// blocking pool; outside one it runs inline.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let notifier = Arc::clone(notifier);
            handle.spawn_blocking(move || {
                let outcome = notifier.notify(&notification);
                report(&notification, outcome);
            });
        }
        Err(_) => {
            let outcome = notifier.notify(&notification);
            report(&notification, outcome);
        }
    }
}
