use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::config::DiscordConfig;
use crate::plugins::traits::{NotificationMessage, NotificationResult, Notifier};
use crate::utils::error::AppError;
use crate::Result;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(client: Client, webhook_url: String, config: DiscordConfig) -> Self {
        DiscordNotifier {
            client,
            webhook_url,
            config,
        }
    }

    fn create_embed(&self, message: &NotificationMessage) -> serde_json::Value {
        let mut embed = json!({
            "title": message.title,
            "description": message.description,
            "color": message.color,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(url) = &message.thumbnail_url {
            embed["thumbnail"] = json!({ "url": url });
        }

        embed["footer"] = json!({
            "text": self.config.username,
        });

        embed
    }

    fn create_webhook_payload(&self, message: &NotificationMessage) -> serde_json::Value {
        let mut payload = json!({
            "embeds": [self.create_embed(message)],
            "username": self.config.username,
        });

        if let Some(avatar_url) = &self.config.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        // Add mentions
        let mut content_parts = Vec::new();

        if let Some(role) = &self.config.mention_role {
            content_parts.push(format!("<@&{}>", role));
        }

        if let Some(user) = &self.config.mention_user {
            content_parts.push(format!("<@{}>", user));
        }

        if !content_parts.is_empty() {
            payload["content"] = json!(content_parts.join(" "));
        }

        payload
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    async fn notify(&self, message: &NotificationMessage) -> Result<NotificationResult> {
        let payload = self.create_webhook_payload(message);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Discord webhook request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(NotificationResult {
                success: true,
                message_id: Some(format!("discord-{}", Uuid::new_v4())),
                error: None,
            }),
            status => Ok(NotificationResult {
                success: false,
                message_id: None,
                error: Some(format!("Discord webhook returned status {}", status)),
            }),
        }
    }
}
