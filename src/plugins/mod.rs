pub mod marketplace;
pub mod notifiers;
pub mod traits;

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, HttpConfig};
use crate::Result;
use marketplace::{BatchThumbnailResolver, CatalogPageSource, CsrfSession, EconomyPurchaser};
use notifiers::{DiscordNotifier, LogNotifier};
use traits::{Notifier, PriceSource, PurchaseExecutor, SessionProvider, ThumbnailResolver};

/// The external collaborators a dispatcher needs, behind their traits.
#[derive(Clone)]
pub struct Collaborators {
    pub price_source: Arc<dyn PriceSource>,
    pub purchaser: Arc<dyn PurchaseExecutor>,
    pub session: Arc<dyn SessionProvider>,
    pub thumbnails: Arc<dyn ThumbnailResolver>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Wire the HTTP adapters. The session is passed in so the caller can
    /// authenticate with it first.
    pub fn from_config(config: &AppConfig, client: Client, session: Arc<CsrfSession>) -> Self {
        let notifier: Arc<dyn Notifier> = match &config.notifications.discord.webhook_url {
            Some(webhook_url) => Arc::new(DiscordNotifier::new(
                client.clone(),
                webhook_url.clone(),
                config.notifications.discord.clone(),
            )),
            None => {
                tracing::warn!("No Discord webhook configured, outcomes will only be logged");
                Arc::new(LogNotifier::new())
            }
        };

        Self {
            price_source: Arc::new(CatalogPageSource::new(
                client.clone(),
                &config.endpoints.catalog_url,
            )),
            purchaser: Arc::new(EconomyPurchaser::new(
                client.clone(),
                &config.endpoints.economy_url,
                Duration::from_millis(config.http.purchase_timeout_ms),
            )),
            session,
            thumbnails: Arc::new(BatchThumbnailResolver::new(
                client,
                &config.endpoints.thumbnails_url,
            )),
            notifier,
        }
    }
}

pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}
