use std::sync::Arc;

use chat_logging::{chat_error, chat_info};
use chatvoice_core::{Notification, NotificationSink};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification backend unavailable")]
    Unavailable,
    #[error("notification failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub silent: bool,
}

pub trait NotificationBackend: Send + Sync {
    fn show(&self, request: NotificationRequest) -> Result<(), NotifyError>;
}

/// Turns filter notifications into system notifications. Fire-and-forget:
/// backend failures are logged only.
pub struct Notifier {
    backend: Arc<dyn NotificationBackend>,
    site_name: String,
}

impl Notifier {
    pub fn new(backend: Arc<dyn NotificationBackend>, site_name: impl Into<String>) -> Self {
        Self {
            backend,
            site_name: site_name.into(),
        }
    }

    pub fn request_for(&self, notification: &Notification) -> NotificationRequest {
        let title = notification
            .fields
            .get("name")
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.site_name)
            .to_string();
        let body = notification
            .fields
            .get("body")
            .filter(|body| !body.is_empty())
            .unwrap_or(&notification.text)
            .to_string();
        NotificationRequest {
            title,
            body,
            silent: notification.silent,
        }
    }
}

impl NotificationSink for Notifier {
    fn notify(&self, notification: Notification) {
        let request = self.request_for(&notification);
        if let Err(err) = self.backend.show(request) {
            chat_error!("Notification from filter {} failed: {}", notification.filter_id, err);
        }
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotificationBackend;

impl NotificationBackend for LogNotificationBackend {
    fn show(&self, request: NotificationRequest) -> Result<(), NotifyError> {
        let marker = if request.silent { " (silent)" } else { "" };
        chat_info!("Notification{}: {}: {}", marker, request.title, request.body);
        Ok(())
    }
}
