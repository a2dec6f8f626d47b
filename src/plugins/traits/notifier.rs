use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::OutcomeKind;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationMessage {
    pub item_id: String,
    pub kind: OutcomeKind,
    pub title: String,
    pub description: String,
    pub color: u32,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Trait for implementing notification methods (Discord, log, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn notify(&self, message: &NotificationMessage) -> Result<NotificationResult>;
}
