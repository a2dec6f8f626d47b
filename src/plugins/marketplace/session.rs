use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, warn};

use super::{cookie_header, CSRF_HEADER};
use crate::config::AppConfig;
use crate::plugins::traits::{Credentials, SessionProvider};
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub name: String,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// Session cookie plus a CSRF token that is cached until `ttl` has passed.
pub struct CsrfSession {
    client: Client,
    cookie: String,
    auth_url: String,
    users_url: String,
    ttl: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl CsrfSession {
    pub fn new(
        client: Client,
        cookie: impl Into<String>,
        auth_url: impl Into<String>,
        users_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            cookie: cookie.into(),
            auth_url: auth_url.into(),
            users_url: users_url.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.session.cookie.clone(),
            config.endpoints.auth_url.clone(),
            config.endpoints.users_url.clone(),
            Duration::from_secs(config.session.csrf_ttl_secs),
        )
    }

    /// Look up the account the cookie belongs to.
    pub async fn authenticate(&self) -> Result<AuthenticatedUser> {
        let response = self
            .client
            .get(&self.users_url)
            .header(reqwest::header::COOKIE, cookie_header(&self.cookie))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Session(format!(
                "authentication check returned status {}",
                status
            )));
        }

        let user: AuthenticatedUser = response.json().await?;
        Ok(user)
    }

    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.auth_url)
            .header(reqwest::header::COOKIE, cookie_header(&self.cookie))
            .send()
            .await?;

        // The endpoint answers 403 while still handing out the token.
        response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Session(format!(
                    "no {} header in response (status {})",
                    CSRF_HEADER,
                    response.status()
                ))
            })
    }

    fn fresh(&self, cached: &Option<CachedToken>) -> Option<String> {
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.token.clone())
    }
}

#[async_trait]
impl SessionProvider for CsrfSession {
    fn cookie(&self) -> String {
        self.cookie.clone()
    }

    async fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.fresh(&*self.cached.read().await) {
            return Ok(Credentials {
                cookie: self.cookie.clone(),
                csrf_token: token,
            });
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.fresh(&cached) {
            return Ok(Credentials {
                cookie: self.cookie.clone(),
                csrf_token: token,
            });
        }

        let strategy = ExponentialBackoff::from_millis(10).take(2);
        let token = Retry::spawn(strategy, || async {
            let result = self.fetch_token().await;
            if let Err(e) = &result {
                warn!("CSRF token refresh failed: {}", e);
            }
            result
        })
        .await?;

        debug!("Refreshed CSRF token");
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });

        Ok(Credentials {
            cookie: self.cookie.clone(),
            csrf_token: token,
        })
    }

    async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            debug!("Dropped cached CSRF token");
        }
    }
}
