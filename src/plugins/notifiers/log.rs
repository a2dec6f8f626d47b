use async_trait::async_trait;
use tracing::info;

use crate::plugins::traits::{NotificationMessage, NotificationResult, Notifier};
use crate::Result;

/// Writes outcomes to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    async fn notify(&self, message: &NotificationMessage) -> Result<NotificationResult> {
        info!(
            item_id = %message.item_id,
            kind = ?message.kind,
            "{}: {}",
            message.title,
            message.description.replace('\n', ", ")
        );
        Ok(NotificationResult {
            success: true,
            message_id: None,
            error: None,
        })
    }
}
